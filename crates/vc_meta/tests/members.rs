use std::sync::Arc;
use std::sync::atomic::{AtomicI32, AtomicI64, Ordering};

use vc_meta::{
    MetaError, ObjectId, SignalSignature, StorageKind, TypeRegistry, Variant, register_builtins,
};

fn registry() -> TypeRegistry {
    let registry = TypeRegistry::new();
    register_builtins(&registry).unwrap();
    registry
}

// -----------------------------------------------------------------------------
// Constructors

#[derive(Debug, PartialEq)]
enum Meter {
    Whole(i32),
    Fraction(f32),
    Pair(i32, f64),
}

fn register_meter(registry: &TypeRegistry) {
    registry
        .register::<Meter>("Meter")
        .unwrap()
        .constructor(Meter::Whole)
        .unwrap()
        .constructor(Meter::Fraction)
        .unwrap()
        .constructor(|a: i32, b: i32| Meter::Pair(a, f64::from(b)))
        .unwrap()
        .constructor(Meter::Pair)
        .unwrap();
}

#[test]
fn exact_constructor_beats_convertible_one() {
    let registry = registry();
    register_meter(&registry);
    let meter = registry.resolve::<Meter>();
    let (i32_ty, f32_ty) = (registry.resolve::<i32>(), registry.resolve::<f32>());

    let by_int = meter.find_constructor(&[i32_ty]).unwrap();
    assert_eq!(by_int.arg_types(), [i32_ty]);
    let by_float = meter.find_constructor(&[f32_ty]).unwrap();
    assert_eq!(by_float.arg_types(), [f32_ty]);

    let built = by_int.invoke(&mut [registry.value(3i32)]).unwrap();
    assert_eq!(built.cast::<Meter>(), Ok(&Meter::Whole(3)));
    assert_eq!(
        registry.find_constructor::<Meter, (f32,)>().map(|c| c.arg_types()[0]),
        Some(f32_ty)
    );
}

#[test]
fn convertible_constructors_are_kept_when_nothing_matches_exactly() {
    let registry = registry();
    register_meter(&registry);
    let meter = registry.resolve::<Meter>();

    // Both single-argument constructors accept a `u8` by conversion; the
    // first registered one is kept.
    let ctor = meter.find_constructor(&[registry.resolve::<u8>()]).unwrap();
    assert_eq!(ctor.arg_types(), [registry.resolve::<i32>()]);
    let built = ctor.invoke(&mut [registry.value(200u8)]).unwrap();
    assert_eq!(built.cast::<Meter>(), Ok(&Meter::Whole(200)));

    // `char` has no converters at all.
    assert!(meter.find_constructor(&[registry.resolve::<char>()]).is_none());
    assert!(meter.find_constructor(&[]).is_none());
}

#[test]
fn a_later_perfect_match_wins_over_partial_ones() {
    let registry = registry();
    register_meter(&registry);
    let (i32_ty, f64_ty) = (registry.resolve::<i32>(), registry.resolve::<f64>());

    let ctor = registry
        .resolve::<Meter>()
        .find_constructor(&[i32_ty, f64_ty])
        .unwrap();
    assert_eq!(ctor.arg_types(), [i32_ty, f64_ty]);

    let built = ctor
        .invoke(&mut [registry.value(1i32), registry.value(0.5f64)])
        .unwrap();
    assert_eq!(built.cast::<Meter>(), Ok(&Meter::Pair(1, 0.5)));
}

#[test]
fn constructor_arity_and_duplicates_are_checked() {
    let registry = registry();
    register_meter(&registry);
    let ctor = registry.find_constructor::<Meter, (i32,)>().unwrap();

    assert_eq!(
        ctor.invoke(&mut []).unwrap_err(),
        MetaError::ArityMismatch { expected: 1, found: 0 }
    );
    assert!(matches!(
        registry.factory::<Meter>().constructor(|v: i32| Meter::Whole(v * 2)),
        Err(MetaError::DuplicateConstructor { .. })
    ));
}

struct Handle(Box<u64>);

struct Owner {
    handle: Handle,
}

#[test]
fn move_only_arguments_are_moved_exactly_once() {
    let registry = registry();
    registry
        .register::<Owner>("Owner")
        .unwrap()
        .constructor(|handle: Handle| Owner { handle })
        .unwrap();
    let ctor = registry.find_constructor::<Owner, (Handle,)>().unwrap();

    let mut args = [registry.value(Handle(Box::new(11)))];
    let owner = ctor.invoke(&mut args).unwrap();
    assert_eq!(*owner.cast::<Owner>().unwrap().handle.0, 11);
    assert_eq!(args[0].kind(), StorageKind::Undefined);

    // The argument is gone; a second call cannot reuse it.
    assert!(matches!(
        ctor.invoke(&mut args),
        Err(MetaError::ArgumentMismatch { index: 0, .. })
    ));

    // A borrowed handle cannot be copied into the call.
    let kept = Handle(Box::new(12));
    assert!(matches!(
        ctor.invoke(&mut [registry.reference(&kept)]),
        Err(MetaError::UnsupportedOperation { .. })
    ));
}

// -----------------------------------------------------------------------------
// Functions

#[derive(Debug, Default, Clone, PartialEq)]
struct Counter {
    value: i32,
}

#[derive(Debug, Default, Clone)]
struct Labeled {
    counter: Counter,
    label: String,
}

impl AsRef<Counter> for Labeled {
    fn as_ref(&self) -> &Counter {
        &self.counter
    }
}

impl AsMut<Counter> for Labeled {
    fn as_mut(&mut self) -> &mut Counter {
        &mut self.counter
    }
}

struct ValueChanged;
impl SignalSignature for ValueChanged {
    type Args = (i32,);
}

struct Swapped;
impl SignalSignature for Swapped {
    type Args = (i32, i32);
}

static LIMIT: AtomicI32 = AtomicI32::new(10);

fn register_counter(registry: &TypeRegistry) -> Result<(), MetaError> {
    registry
        .register::<Counter>("Counter")?
        .with_default()
        .with_clone()
        .signal::<ValueChanged>("value_changed")?
        .signal::<Swapped>("swapped")?
        .function("zero", Counter::default)?
        .method("get", |c: &Counter| c.value)?
        .method("plus", |c: &Counter, by: i32| c.value + by)?
        .method_mut("add", |c: &mut Counter, by: i32| c.value += by)?
        .property_with_signal(
            "value",
            |c: &Counter| c.value,
            |c: &mut Counter, v: i32| c.value = v,
            "value_changed",
        )?
        .read_only_property("doubled", |c: &Counter| c.value * 2)?
        .static_property(
            "limit",
            || LIMIT.load(Ordering::Relaxed),
            |v: i32| LIMIT.store(v, Ordering::Relaxed),
        )?
        .read_only_static_property("name", || "Counter".to_string())?;
    registry
        .register::<Labeled>("Labeled")?
        .with_clone()
        .base::<Counter>()?
        .method("label", |l: &Labeled| l.label.clone())?;
    Ok(())
}

#[test]
fn function_metadata_describes_the_signature() {
    let registry = registry();
    register_counter(&registry).unwrap();
    let counter = registry.resolve::<Counter>();

    let zero = counter.find_function("zero").unwrap();
    assert!(zero.is_static() && !zero.is_const());
    assert_eq!(zero.return_type(), counter);

    let plus = counter.find_function("plus").unwrap();
    assert!(plus.is_const());
    assert_eq!(plus.arg_count(), 1);
    assert_eq!(plus.arg_type(0), Some(registry.resolve::<i32>()));
    assert_eq!(plus.arg_type(1), None);

    let add = counter.find_function("add").unwrap();
    assert!(!add.is_static() && !add.is_const());
    assert!(add.return_type().is_void());
    assert_eq!(add.owner(), counter);
}

#[test]
fn functions_run_on_values_and_references() {
    let registry = registry();
    register_counter(&registry).unwrap();
    let counter = registry.resolve::<Counter>();

    let made = counter.find_function("zero").unwrap().invoke_static(&mut []).unwrap();
    assert!(made.equals(&Counter { value: 0 }));

    let mut target = Counter { value: 5 };
    let mut instance = registry.reference_mut(&mut target);
    let sum = counter
        .find_function("plus")
        .unwrap()
        .invoke(&instance, &mut [registry.value(2i64)])
        .unwrap();
    assert!(sum.equals(&7i32));

    let returned = counter
        .find_function("add")
        .unwrap()
        .invoke_mut(&mut instance, &mut [registry.value(4i32)])
        .unwrap();
    assert!(returned.is_undefined());
    drop(instance);
    assert_eq!(target.value, 9);
}

#[test]
fn receivers_are_checked() {
    let registry = registry();
    register_counter(&registry).unwrap();
    let counter = registry.resolve::<Counter>();
    let (get, add) = (
        counter.find_function("get").unwrap(),
        counter.find_function("add").unwrap(),
    );
    let frozen = Counter { value: 1 };
    let mut by_ref = registry.reference(&frozen);

    assert!(matches!(get.invoke_static(&mut []), Err(MetaError::InstanceRequired { .. })));
    assert!(matches!(
        add.invoke(&by_ref, &mut [registry.value(1i32)]),
        Err(MetaError::ConstViolation { .. })
    ));
    assert!(matches!(
        add.invoke_mut(&mut by_ref, &mut [registry.value(1i32)]),
        Err(MetaError::ConstViolation { .. })
    ));
    assert!(matches!(
        get.invoke(&registry.value(3u8), &mut []),
        Err(MetaError::BadCast { .. })
    ));
    assert!(matches!(
        get.invoke(&Variant::new(), &mut []),
        Err(MetaError::InstanceRequired { .. })
    ));
    assert!(matches!(
        registry.factory::<Counter>().method("get", |c: &Counter| c.value + 1),
        Err(MetaError::DuplicateFunction { .. })
    ));
}

#[test]
fn base_methods_accept_derived_instances() {
    let registry = registry();
    register_counter(&registry).unwrap();
    let labeled = registry.resolve::<Labeled>();
    let mut instance = registry.value(Labeled {
        counter: Counter { value: 2 },
        label: "hits".to_string(),
    });

    let add = labeled.find_function("add").unwrap();
    assert_eq!(add.owner(), registry.resolve::<Counter>());
    add.invoke_mut(&mut instance, &mut [registry.value(3i32)]).unwrap();

    let get = labeled.find_function("get").unwrap();
    assert!(get.invoke(&instance, &mut []).unwrap().equals(&5i32));
    let label = labeled.find_function("label").unwrap();
    assert!(label.invoke(&instance, &mut []).unwrap().equals(&"hits".to_string()));
    assert!(labeled.find_property("value").is_some());
    assert!(labeled.find_signal("value_changed").is_some());
    assert!(registry.resolve::<Counter>().find_function("label").is_none());
}

// -----------------------------------------------------------------------------
// Properties

#[test]
fn properties_read_and_write() {
    let registry = registry();
    register_counter(&registry).unwrap();
    let counter = registry.resolve::<Counter>();
    let mut instance = registry.value(Counter { value: 4 });

    let doubled = counter.find_property("doubled").unwrap();
    assert!(doubled.is_read_only() && !doubled.is_static());
    assert!(doubled.get(&instance).unwrap().equals(&8i32));
    assert_eq!(
        doubled.set(&mut instance, registry.value(1i32)).unwrap_err(),
        MetaError::ReadOnlyProperty { name: "doubled".into() }
    );

    let value = counter.find_property("value").unwrap();
    assert_eq!(value.value_type(), registry.resolve::<i32>());
    value.set(&mut instance, registry.value(6.9f64)).unwrap();
    assert!(value.get(&instance).unwrap().equals(&6i32));
    assert!(doubled.get(&instance).unwrap().equals(&12i32));
}

#[test]
fn static_properties_need_no_instance() {
    let registry = registry();
    register_counter(&registry).unwrap();
    let counter = registry.resolve::<Counter>();

    let limit = counter.find_property("limit").unwrap();
    assert!(limit.is_static());
    limit.set_static(registry.value(25i32)).unwrap();
    assert!(limit.get_static().unwrap().equals(&25i32));
    assert!(limit.get(&Variant::new()).unwrap().equals(&25i32));

    let name = counter.find_property("name").unwrap();
    assert!(name.get_static().unwrap().equals(&"Counter".to_string()));
    assert!(matches!(
        name.set_static(registry.value("x".to_string())),
        Err(MetaError::ReadOnlyProperty { .. })
    ));
    assert!(matches!(
        counter.find_property("value").unwrap().get_static(),
        Err(MetaError::InstanceRequired { .. })
    ));
}

#[test]
fn setting_a_linked_property_emits_the_new_value() {
    let registry = registry();
    register_counter(&registry).unwrap();
    let counter_ty = registry.resolve::<Counter>();
    let mut counter = Counter::default();
    let seen = Arc::new(AtomicI64::new(-1));

    let signal = counter_ty.find_property("value").unwrap().signal().unwrap();
    let sink = Arc::clone(&seen);
    let _connection = signal
        .connect(ObjectId::of(&counter), move |v: i32| {
            sink.store(i64::from(v), Ordering::Relaxed);
        })
        .unwrap();

    let mut instance = registry.reference_mut(&mut counter);
    counter_ty
        .find_property("value")
        .unwrap()
        .set(&mut instance, registry.value(42i32))
        .unwrap();
    drop(instance);

    assert_eq!(counter.value, 42);
    assert_eq!(seen.load(Ordering::Relaxed), 42);
}

#[test]
fn linked_signals_must_exist_and_take_one_argument() {
    let registry = registry();
    register_counter(&registry).unwrap();
    let mut factory = registry.factory::<Counter>();

    assert!(matches!(
        factory.property_with_signal("a", |c: &Counter| c.value, |_: &mut Counter, _: i32| {}, "missing"),
        Err(MetaError::UnknownSignal { .. })
    ));
    assert_eq!(
        factory
            .property_with_signal("b", |c: &Counter| c.value, |_: &mut Counter, _: i32| {}, "swapped")
            .err(),
        Some(MetaError::ArityMismatch { expected: 1, found: 2 })
    );
}

#[test]
fn linked_signals_must_accept_the_property_type() {
    struct Opaque;
    struct Poked;
    impl SignalSignature for Poked {
        type Args = (Opaque,);
    }
    struct Widened;
    impl SignalSignature for Widened {
        type Args = (i64,);
    }

    let registry = registry();
    register_counter(&registry).unwrap();
    let mut factory = registry.factory::<Counter>();
    factory.signal::<Poked>("poked").unwrap().signal::<Widened>("widened").unwrap();

    assert!(matches!(
        factory.property_with_signal("a", |c: &Counter| c.value, |c: &mut Counter, v: i32| c.value = v, "poked"),
        Err(MetaError::ArgumentMismatch { index: 0, .. })
    ));
    assert!(registry.resolve::<Counter>().find_property("a").is_none());

    // `i32` converts to `i64`, so the link is accepted.
    factory
        .property_with_signal("b", |c: &Counter| c.value, |c: &mut Counter, v: i32| c.value = v, "widened")
        .unwrap();

    let seen = Arc::new(AtomicI64::new(0));
    let sink = Arc::clone(&seen);
    let mut counter = Counter::default();
    let signal = registry.resolve::<Counter>().find_signal("widened").unwrap();
    let _connection = signal
        .connect(ObjectId::of(&counter), move |v: i64| sink.store(v, Ordering::Relaxed))
        .unwrap();

    let mut instance = registry.reference_mut(&mut counter);
    registry
        .resolve::<Counter>()
        .find_property("b")
        .unwrap()
        .set(&mut instance, registry.value(7i32))
        .unwrap();
    drop(instance);
    assert_eq!(counter.value, 7);
    assert_eq!(seen.load(Ordering::Relaxed), 7);
}

// -----------------------------------------------------------------------------
// Converters and registry lifecycle

#[test]
fn converters_check_their_source_and_duplicates() {
    let registry = registry();
    register_counter(&registry).unwrap();
    registry
        .factory::<Counter>()
        .converter_with(|c: &Counter| i64::from(c.value))
        .unwrap();

    let counter = registry.resolve::<Counter>();
    let converter = counter.find_converter(registry.resolve::<i64>()).unwrap();
    assert_eq!(converter.from(), counter);
    assert!(converter.convert(&registry.value(Counter { value: 3 })).unwrap().equals(&3i64));
    assert!(matches!(
        converter.convert(&registry.value(3i64)),
        Err(MetaError::BadCast { .. })
    ));
    assert!(matches!(
        registry.factory::<Counter>().converter_with(|_: &Counter| 0i64),
        Err(MetaError::DuplicateConverter { .. })
    ));
    // Converters are not inherited.
    assert!(registry.resolve::<Labeled>().find_converter(registry.resolve::<i64>()).is_none());
}

#[test]
fn clear_drops_members_but_keeps_descriptors() {
    let registry = registry();
    register_counter(&registry).unwrap();
    let counter = registry.resolve::<Counter>();
    let get = counter.find_function("get").unwrap();

    registry.clear();
    assert!(registry.find_type("Counter").is_none());
    assert!(counter.find_function("get").is_none());
    assert!(counter.functions().is_empty() && counter.signals().is_empty());
    assert!(counter.has_clone());

    // Entries handed out earlier stay usable.
    assert!(get.invoke(&registry.value(Counter { value: 8 }), &mut []).unwrap().equals(&8i32));

    register_builtins(&registry).unwrap();
    register_counter(&registry).unwrap();
    assert_eq!(registry.find_type("Counter"), Some(counter));
}
