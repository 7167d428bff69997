use vc_meta::{
    BinaryOperator, MetaError, RawPtr, StorageKind, TypeRegistry, UnaryOperator, Variant,
    register_builtins,
};

fn registry() -> TypeRegistry {
    let registry = TypeRegistry::new();
    register_builtins(&registry).unwrap();
    registry
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Shape {
    id: u32,
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Circle {
    shape: Shape,
    radius: f32,
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Wheel {
    circle: Circle,
    spokes: u8,
}

impl AsRef<Shape> for Circle {
    fn as_ref(&self) -> &Shape {
        &self.shape
    }
}

impl AsMut<Shape> for Circle {
    fn as_mut(&mut self) -> &mut Shape {
        &mut self.shape
    }
}

impl AsRef<Circle> for Wheel {
    fn as_ref(&self) -> &Circle {
        &self.circle
    }
}

impl AsMut<Circle> for Wheel {
    fn as_mut(&mut self) -> &mut Circle {
        &mut self.circle
    }
}

fn register_shapes(registry: &TypeRegistry) -> Result<(), MetaError> {
    registry.register::<Shape>("Shape")?.with_default().with_clone();
    registry
        .register::<Circle>("Circle")?
        .with_default()
        .with_clone()
        .base::<Shape>()?;
    registry
        .register::<Wheel>("Wheel")?
        .with_clone()
        .base::<Circle>()?;
    Ok(())
}

// -----------------------------------------------------------------------------
// Numeric bridging

#[test]
fn integral_times_float_computes_in_float() {
    let registry = registry();
    let product = &registry.value(42i8) * &registry.value(0.5f32);

    assert_eq!(product.ty(), Some(registry.resolve::<f32>()));
    assert!(product.equals(&21.0f32));
}

#[test]
fn integral_with_double_computes_in_double() {
    let registry = registry();
    let sum = &registry.value(5i32) + &registry.value(0.5f64);

    assert_eq!(sum.ty(), Some(registry.resolve::<f64>()));
    assert!(sum.equals(&5.5f64));
}

#[test]
fn floating_left_converts_the_right_operand() {
    let registry = registry();
    let rem = &registry.value(3.0f64) % &registry.value(2.0f32);

    assert_eq!(rem.ty(), Some(registry.resolve::<f64>()));
    assert!(rem.equals(&1.0f64));
}

#[test]
fn mixed_integers_take_the_left_type() {
    let registry = registry();

    assert!((&registry.value(300i32) + &registry.value(1u8)).equals(&301i32));
    assert!((&registry.value(10u8) + &registry.value(300i32)).equals(&54u8));
    assert!((&registry.value(i8::MAX) + &registry.value(1i8)).equals(&i8::MIN));
}

#[test]
fn assignment_keeps_the_left_type() {
    let registry = registry();
    let mut value = registry.value(5i32);

    value += &registry.value(0.5f64);
    assert!(value.equals(&5i32));

    value *= &registry.value(2.5f32);
    assert!(value.equals(&12i32));

    value -= &registry.value(2u64);
    assert!(value.equals(&10i32));
}

#[test]
fn assignment_through_mutable_reference_writes_back() {
    let registry = registry();
    let mut target = 1.5f64;
    {
        let mut by_ref = registry.reference_mut(&mut target);
        by_ref.try_mul_assign(&registry.value(4i32)).unwrap();
    }
    assert_eq!(target, 6.0);

    let frozen = 2u16;
    let mut by_ref = registry.reference(&frozen);
    assert!(matches!(
        by_ref.try_add_assign(&registry.value(1u16)),
        Err(MetaError::ConstViolation { .. })
    ));
}

#[test]
fn integer_division_by_zero_is_an_error() {
    let registry = registry();

    assert_eq!(
        registry.value(7u32).try_div(&registry.value(0u32)).unwrap_err(),
        MetaError::DivisionByZero
    );
    assert_eq!(
        registry.value(7i64).try_rem(&registry.value(0.25f64)).unwrap_err(),
        MetaError::DivisionByZero
    );
}

#[test]
fn negation_and_truthiness() {
    let registry = registry();

    assert!((-&registry.value(4i16)).equals(&-4i16));
    assert!(registry
        .value(2.5f32)
        .try_unary(UnaryOperator::Minus)
        .unwrap()
        .equals(&-2.5f32));
    assert_eq!(registry.value(0u8).to_bool(), Ok(false));
    assert_eq!(registry.value(-0.1f64).to_bool(), Ok(true));
}

#[test]
fn unregistered_operations_are_unsupported() {
    let registry = registry();
    register_shapes(&registry).unwrap();
    let shape = registry.value(Shape::default());

    assert!(matches!(
        shape.try_add(&registry.value(Shape::default())),
        Err(MetaError::UnsupportedOperation { .. })
    ));
    assert!(matches!(shape.to_bool(), Err(MetaError::UnsupportedOperation { .. })));
    assert!(matches!(shape.try_neg(), Err(MetaError::UnsupportedOperation { .. })));
    assert_eq!(Variant::new().try_add(&shape).unwrap_err(), MetaError::UndefinedValue);
}

#[test]
fn custom_operators_convert_the_right_operand() {
    let registry = registry();
    registry
        .factory::<Shape>()
        .with_clone()
        .with_binary_operator(BinaryOperator::Addition, |a: &Shape, b: &Shape| Shape {
            id: a.id + b.id,
        })
        .converter_with(|s: &Shape| s.id)
        .unwrap();
    registry
        .factory::<u32>()
        .converter_with(|id: &u32| Shape { id: *id })
        .unwrap();

    let sum = &registry.value(Shape { id: 2 }) + &registry.value(5u32);
    assert_eq!(sum.cast::<Shape>(), Ok(&Shape { id: 7 }));
    assert!(matches!(
        registry.value(Shape { id: 2 }).try_add(&registry.value(1.0f32)),
        Err(MetaError::ArgumentMismatch { .. })
    ));
}

// -----------------------------------------------------------------------------
// Pointer-like values

#[test]
fn pointers_only_take_usize_offsets() {
    let registry = registry();
    registry.factory::<RawPtr<u32>>().with_pointer_arithmetic();
    let ptr = RawPtr::<u32>::from_addr(0x1000);

    assert!(registry.resolve::<RawPtr<u32>>().is_pointer());
    let moved = &registry.value(ptr) + &registry.value(3usize);
    assert_eq!(moved.cast::<RawPtr<u32>>().map(|p| p.addr()), Ok(0x100c));

    let mut back = moved;
    back -= &registry.value(1usize);
    assert_eq!(back.cast::<RawPtr<u32>>().map(|p| p.addr()), Ok(0x1008));

    assert!(matches!(
        registry.value(ptr).try_add(&registry.value(3i32)),
        Err(MetaError::ArgumentMismatch { .. })
    ));
    assert!(matches!(
        registry.value(ptr).try_mul(&registry.value(3usize)),
        Err(MetaError::UnsupportedOperation { .. })
    ));
}

// -----------------------------------------------------------------------------
// Copy, move and storage

#[test]
fn copies_are_deep_and_moves_leave_undefined() {
    let registry = registry();
    let original = String::from("deep");
    let by_ref = registry.reference(&original);

    let mut copy = by_ref.try_clone().unwrap();
    assert_eq!(copy.kind(), StorageKind::ValueHeap);
    copy.cast_mut::<String>().unwrap().push('!');
    assert_eq!(original, "deep");

    let mut target = registry.value(String::from("old"));
    target.copy_from(&by_ref).unwrap();
    assert!(target.equals(&String::from("deep")));

    let moved = target.take();
    assert!(target.is_undefined());
    assert!(moved.equals(&String::from("deep")));
}

#[test]
fn copying_into_a_mutable_reference_writes_through() {
    let registry = registry();
    let source = String::from("new");
    let mut target = String::from("old");
    let frozen = String::from("kept");

    let mut by_mut = registry.reference_mut(&mut target);
    by_mut.copy_from(&registry.reference(&source)).unwrap();
    assert_eq!(by_mut.kind(), StorageKind::RefMutable);
    drop(by_mut);
    assert_eq!(target, "new");

    // A constant reference cannot be written and is rebound instead.
    let mut by_ref = registry.reference(&frozen);
    by_ref.copy_from(&registry.value(String::from("copy"))).unwrap();
    assert_eq!(by_ref.kind(), StorageKind::ValueHeap);
    assert!(by_ref.equals(&String::from("copy")));
    drop(by_ref);
    assert_eq!(frozen, "kept");

    // A different type rebinds the reference to an owned copy.
    let mut number = 3i32;
    let mut by_mut = registry.reference_mut(&mut number);
    by_mut.copy_from(&registry.value(4u8)).unwrap();
    assert!(by_mut.equals(&4u8));
    drop(by_mut);
    assert_eq!(number, 3);
}

#[test]
fn emplace_replaces_and_assign_rebinds() {
    let registry = registry();
    let mut external = 9i32;
    let mut var = Variant::new();
    var.emplace(registry.resolve::<u8>(), 1u8);
    assert_eq!(var.kind(), StorageKind::ValueInline);
    var.emplace(registry.resolve::<[u64; 4]>(), [7u64; 4]);
    assert_eq!(var.kind(), StorageKind::ValueHeap);
    assert_eq!(var.try_as_ref::<[u64; 4]>(), Some(&[7; 4]));

    var.assign_mut(registry.resolve::<i32>(), &mut external);
    assert_eq!(var.kind(), StorageKind::RefMutable);
    *var.cast_mut::<i32>().unwrap() = 10;
    drop(var);
    assert_eq!(external, 10);
}

#[test]
fn over_aligned_zero_sized_values_are_supported() {
    #[repr(align(64))]
    struct Marker;

    let registry = registry();
    let mut var = registry.value(Marker);
    assert_eq!(var.kind(), StorageKind::ValueHeap);
    assert!(var.take_value::<Marker>().is_some());
}

// -----------------------------------------------------------------------------
// Casts and conversions

#[test]
fn casts_follow_registered_bases() {
    let registry = registry();
    register_shapes(&registry).unwrap();

    let wheel = Wheel {
        circle: Circle {
            shape: Shape { id: 3 },
            radius: 1.5,
        },
        spokes: 12,
    };
    let mut var = registry.value(wheel);

    assert!(var.is_cast_able::<Circle>());
    assert!(var.is_cast_able::<Shape>());
    assert!(!var.is_cast_able::<String>());
    assert_eq!(var.cast::<Circle>().map(|c| c.radius), Ok(1.5));
    assert_eq!(var.cast::<Shape>(), Ok(&Shape { id: 3 }));

    var.cast_mut::<Shape>().unwrap().id = 4;
    assert_eq!(var.cast::<Wheel>().map(|w| w.circle.shape.id), Ok(4));
    assert!(matches!(var.cast::<String>(), Err(MetaError::BadCast { .. })));
}

#[test]
fn bases_are_rejected_twice() {
    let registry = registry();
    register_shapes(&registry).unwrap();

    assert!(matches!(
        registry.factory::<Circle>().base::<Shape>(),
        Err(MetaError::DuplicateBase { .. })
    ));
    let wheel = registry.resolve::<Wheel>();
    assert_eq!(wheel.find_base(core::any::TypeId::of::<Shape>()), Some(registry.resolve::<Shape>()));
}

#[test]
fn missing_converters_give_undefined() {
    let registry = registry();
    register_shapes(&registry).unwrap();

    let converted = registry.value(Shape::default()).convert(registry.resolve::<i32>());
    assert!(converted.is_undefined());
    assert_eq!(converted.to_bool(), Ok(false));

    let round_trip = registry
        .value(200u8)
        .convert(registry.resolve::<f64>())
        .convert(registry.resolve::<u8>());
    assert!(round_trip.equals(&200u8));
}
