//! Positional arguments.
//!
//! A dispatch carries its arguments type-erased as a slice of [`Arg`] so that
//! listeners of ancestor messages can receive a prefix of them. Typed code
//! never touches the erased form directly: messages and listeners declare
//! tuples, and [`ArgList`] converts between the tuple and the erased slice.
//!
//! [`ArgList`] is implemented for tuples of up to 12 elements. Each arity also
//! names its positional callback shape (`dyn Fn(A1, .., An)`), which is what
//! native event slots store.

use crate::error::ArgMismatch;
use std::{
    any::{Any, TypeId},
    fmt,
    rc::Rc,
};

/// A value that can travel as a message argument.
///
/// Implemented for every `'static` type that is `Debug + PartialEq`. Equality
/// is what consolidation uses to recognise duplicate dispatches.
pub trait ArgValue: Any + fmt::Debug {
    /// Borrow as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Compare with another erased argument; different types are unequal.
    fn arg_eq(&self, other: &dyn ArgValue) -> bool;

    /// Type id of the concrete value.
    fn arg_type_id(&self) -> TypeId;

    /// Type name of the concrete value.
    fn arg_type_name(&self) -> &'static str;
}

impl<T: Any + fmt::Debug + PartialEq> ArgValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn arg_eq(&self, other: &dyn ArgValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn arg_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn arg_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// A type-erased, shared argument.
pub type Arg = Rc<dyn ArgValue>;

/// Erase a value into an [`Arg`].
pub fn arg<T: ArgValue>(value: T) -> Arg {
    Rc::new(value)
}

/// Build a `Vec<Arg>` from expressions.
///
/// ```rust,ignore
/// bus.send_dyn(key, &source, None, args![1.5_f64, "left".to_string()])?;
/// ```
#[macro_export]
macro_rules! args {
    ($($value:expr),* $(,)?) => {
        vec![$($crate::arg($value)),*]
    };
}

/// One declared parameter.
#[derive(Debug, Clone, Copy)]
pub struct ParamType {
    id: TypeId,
    name: &'static str,
}

impl ParamType {
    /// Parameter of type `T`.
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Type id of the parameter.
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Type name of the parameter.
    pub fn type_name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ParamType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ParamType {}

/// An ordered parameter list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamSpec(Vec<ParamType>);

impl ParamSpec {
    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The parameters in order.
    pub fn iter(&self) -> impl Iterator<Item = &ParamType> {
        self.0.iter()
    }

    /// Whether `self` is a (possibly equal) prefix of `other`.
    pub fn is_prefix_of(&self, other: &ParamSpec) -> bool {
        self.len() <= other.len() && self.0.iter().zip(&other.0).all(|(a, b)| a == b)
    }

    /// Check that `args` supplies every parameter with the declared type.
    ///
    /// Extra trailing arguments are allowed.
    pub fn check(&self, args: &[Arg]) -> Result<(), ArgMismatch> {
        if args.len() < self.len() {
            return Err(ArgMismatch::Missing {
                expected: self.len(),
                found: args.len(),
            });
        }
        for (index, (param, arg)) in self.0.iter().zip(args).enumerate() {
            if arg.arg_type_id() != param.id {
                return Err(ArgMismatch::Type {
                    index,
                    expected: param.name,
                    found: arg.arg_type_name(),
                });
            }
        }
        Ok(())
    }
}

impl From<Vec<ParamType>> for ParamSpec {
    fn from(params: Vec<ParamType>) -> Self {
        Self(params)
    }
}

impl fmt::Display for ParamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, param) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(param.name)?;
        }
        Ok(())
    }
}

/// A tuple of positional arguments.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a valid argument list",
    label = "expected a tuple of up to 12 `Clone + Debug + PartialEq + 'static` values",
    note = "Message and listener arguments are declared as tuples, e.g. `(f64,)` or `(u32, String)`."
)]
pub trait ArgList: Sized + Clone + 'static {
    /// The positional callback shape for this arity, e.g. `dyn Fn(A1, A2)`.
    type Callback: ?Sized + 'static;

    /// The declared parameter list.
    fn params() -> ParamSpec;

    /// Erase into positional arguments.
    fn into_args(self) -> Vec<Arg>;

    /// Rebuild from (a prefix of) positional arguments.
    fn from_args(args: &[Arg]) -> Result<Self, ArgMismatch>;

    /// Turn a closure over the tuple into a positional callback.
    fn spread<F>(f: F) -> Box<Self::Callback>
    where
        F: Fn(Self) + 'static;

    /// Invoke a positional callback with the tuple's elements.
    fn call(callback: &Self::Callback, args: Self);
}

impl ArgList for () {
    type Callback = dyn Fn();

    fn params() -> ParamSpec {
        ParamSpec::default()
    }

    fn into_args(self) -> Vec<Arg> {
        Vec::new()
    }

    fn from_args(_args: &[Arg]) -> Result<Self, ArgMismatch> {
        Ok(())
    }

    fn spread<F>(f: F) -> Box<Self::Callback>
    where
        F: Fn(Self) + 'static,
    {
        Box::new(move || f(()))
    }

    fn call(callback: &Self::Callback, _args: Self) {
        callback()
    }
}

fn take<T: ArgValue + Clone>(args: &[Arg], index: usize) -> Result<T, ArgMismatch> {
    let arg = args.get(index).ok_or(ArgMismatch::Missing {
        expected: index + 1,
        found: args.len(),
    })?;
    arg.as_any()
        .downcast_ref::<T>()
        .cloned()
        .ok_or(ArgMismatch::Type {
            index,
            expected: std::any::type_name::<T>(),
            found: arg.arg_type_name(),
        })
}

/// Implement `ArgList` for a tuple arity.
macro_rules! impl_arg_list {
    ($len:literal => $($T:ident $idx:tt),+) => {
        impl<$($T,)+> ArgList for ($($T,)+)
        where
            $($T: ArgValue + Clone,)+
        {
            type Callback = dyn Fn($($T),+);

            fn params() -> ParamSpec {
                ParamSpec::from(vec![$(ParamType::of::<$T>()),+])
            }

            fn into_args(self) -> Vec<Arg> {
                vec![$(Rc::new(self.$idx) as Arg),+]
            }

            fn from_args(args: &[Arg]) -> Result<Self, ArgMismatch> {
                if args.len() < $len {
                    return Err(ArgMismatch::Missing {
                        expected: $len,
                        found: args.len(),
                    });
                }
                Ok(($(take::<$T>(args, $idx)?,)+))
            }

            #[allow(non_snake_case)]
            fn spread<F>(f: F) -> Box<Self::Callback>
            where
                F: Fn(Self) + 'static,
            {
                Box::new(move |$($T: $T),+| f(($($T,)+)))
            }

            #[allow(non_snake_case)]
            fn call(callback: &Self::Callback, args: Self) {
                let ($($T,)+) = args;
                callback($($T),+)
            }
        }
    };
}

impl_arg_list!(1 => A1 0);
impl_arg_list!(2 => A1 0, A2 1);
impl_arg_list!(3 => A1 0, A2 1, A3 2);
impl_arg_list!(4 => A1 0, A2 1, A3 2, A4 3);
impl_arg_list!(5 => A1 0, A2 1, A3 2, A4 3, A5 4);
impl_arg_list!(6 => A1 0, A2 1, A3 2, A4 3, A5 4, A6 5);
impl_arg_list!(7 => A1 0, A2 1, A3 2, A4 3, A5 4, A6 5, A7 6);
impl_arg_list!(8 => A1 0, A2 1, A3 2, A4 3, A5 4, A6 5, A7 6, A8 7);
impl_arg_list!(9 => A1 0, A2 1, A3 2, A4 3, A5 4, A6 5, A7 6, A8 7, A9 8);
impl_arg_list!(10 => A1 0, A2 1, A3 2, A4 3, A5 4, A6 5, A7 6, A8 7, A9 8, A10 9);
impl_arg_list!(11 => A1 0, A2 1, A3 2, A4 3, A5 4, A6 5, A7 6, A8 7, A9 8, A10 9, A11 10);
impl_arg_list!(12 => A1 0, A2 1, A3 2, A4 3, A5 4, A6 5, A7 6, A8 7, A9 8, A10 9, A11 10, A12 11);
