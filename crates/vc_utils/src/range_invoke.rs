/// Invokes `$macro` once per arity from `0` to [`MAX_ARITY`](crate::MAX_ARITY).
///
/// Each invocation receives `index: TypeParam` pairs, so the callee can use
/// the index to address a slice or tuple field and the ident as a generic.
///
/// # Example
///
/// ```ignore
/// range_invoke!(impl_arg_list);
/// // expands to ↓
/// impl_arg_list!();
/// impl_arg_list!(0: P0);
/// impl_arg_list!(0: P0, 1: P1);
/// // ...
/// impl_arg_list!(0: P0, 1: P1, 2: P2, 3: P3, 4: P4, 5: P5, 6: P6, 7: P7);
/// ```
#[macro_export]
macro_rules! range_invoke {
    ($(#[$meta:meta])* $macro:ident) => {
        $(#[$meta])* $macro!();
        $(#[$meta])* $macro!(0: P0);
        $(#[$meta])* $macro!(0: P0, 1: P1);
        $(#[$meta])* $macro!(0: P0, 1: P1, 2: P2);
        $(#[$meta])* $macro!(0: P0, 1: P1, 2: P2, 3: P3);
        $(#[$meta])* $macro!(0: P0, 1: P1, 2: P2, 3: P3, 4: P4);
        $(#[$meta])* $macro!(0: P0, 1: P1, 2: P2, 3: P3, 4: P4, 5: P5);
        $(#[$meta])* $macro!(0: P0, 1: P1, 2: P2, 3: P3, 4: P4, 5: P5, 6: P6);
        $(#[$meta])* $macro!(0: P0, 1: P1, 2: P2, 3: P3, 4: P4, 5: P5, 6: P6, 7: P7);
    };
}
