// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed method adapters.
//!
//! [`MethodFn`] is implemented for every `Fn(&mut T, A1, .., An) -> R` with
//! `n <= MAX_METHOD_ARGS`. The builder erases it into one trampoline that
//! unpacks a `Vec<Value>` and boxes the return value.

use std::any::Any;

use super::value::Value;
use crate::error::ReflectError;
use crate::registry::ArgInfo;

/// A callable usable as a method of `T`. `Args` is the argument tuple.
pub trait MethodFn<T, Args>: Send + Sync + 'static {
    fn signature() -> Vec<ArgInfo>;

    /// Rust name of the return type, `None` for `()`.
    fn return_type() -> Option<&'static str>;

    fn call(&self, method: &str, target: &mut T, args: Vec<Value>) -> Result<Value, ReflectError>;
}

fn return_name<R: Any>() -> Option<&'static str> {
    if Value::is_unit::<R>() {
        None
    } else {
        Some(std::any::type_name::<R>())
    }
}

macro_rules! impl_method_fn {
    ($($arg:ident),*) => {
        impl<T, F, R, $($arg,)*> MethodFn<T, ($($arg,)*)> for F
        where
            T: 'static,
            F: Fn(&mut T, $($arg),*) -> R + Send + Sync + 'static,
            R: Any,
            $($arg: Any,)*
        {
            fn signature() -> Vec<ArgInfo> {
                vec![$(ArgInfo::of::<$arg>()),*]
            }

            fn return_type() -> Option<&'static str> {
                return_name::<R>()
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn call(
                &self,
                method: &str,
                target: &mut T,
                args: Vec<Value>,
            ) -> Result<Value, ReflectError> {
                let expected = <[&str]>::len(&[$(stringify!($arg)),*]);
                if args.len() != expected {
                    return Err(ReflectError::ArgumentCount {
                        method: method.to_owned(),
                        expected,
                        got: args.len(),
                    });
                }
                let mut args = args.into_iter().enumerate();
                $(
                    let $arg = match args.next() {
                        Some((index, value)) => unpack::<$arg>(method, index, value)?,
                        None => {
                            return Err(ReflectError::ArgumentCount {
                                method: method.to_owned(),
                                expected,
                                got: 0,
                            })
                        }
                    };
                )*
                Ok(Value::from_return((self)(target, $($arg),*)))
            }
        }
    };
}

fn unpack<A: Any>(method: &str, index: usize, value: Value) -> Result<A, ReflectError> {
    let found = value.type_name().unwrap_or("()");
    value.take::<A>().map_err(|_| ReflectError::ArgumentType {
        method: method.to_owned(),
        index,
        expected: std::any::type_name::<A>().to_owned(),
        found: found.to_owned(),
    })
}

impl_method_fn!();
impl_method_fn!(A1);
impl_method_fn!(A1, A2);
impl_method_fn!(A1, A2, A3);
impl_method_fn!(A1, A2, A3, A4);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_METHOD_ARGS;

    struct Counter {
        total: i64,
    }

    fn call<Args, M: MethodFn<Counter, Args>>(
        m: M,
        c: &mut Counter,
        args: Vec<Value>,
    ) -> Result<Value, ReflectError> {
        m.call("m", c, args)
    }

    #[test]
    fn test_arities() {
        let mut c = Counter { total: 0 };
        call(|c: &mut Counter| c.total += 1, &mut c, vec![]).unwrap();
        call(|c: &mut Counter, a: i64| c.total += a, &mut c, vec![Value::new(2i64)]).unwrap();
        let out = call(
            |c: &mut Counter, a: i64, b: i64, d: i64, e: i64| {
                c.total += a + b + d + e;
                c.total
            },
            &mut c,
            vec![Value::new(1i64), Value::new(1i64), Value::new(1i64), Value::new(1i64)],
        )
        .unwrap();
        assert_eq!(out.take::<i64>().unwrap(), 7);
        assert_eq!(MAX_METHOD_ARGS, 4);
    }

    #[test]
    fn test_unit_return_is_empty() {
        let mut c = Counter { total: 0 };
        let out = call(|c: &mut Counter| c.total = 9, &mut c, vec![]).unwrap();
        assert!(out.is_empty());
        assert_eq!(
            <fn(&mut Counter) as MethodFn<Counter, ()>>::return_type(),
            None
        );
    }

    #[test]
    fn test_argument_errors() {
        let mut c = Counter { total: 0 };
        let err = call(|c: &mut Counter, a: i64| c.total = a, &mut c, vec![]).unwrap_err();
        assert!(matches!(err, ReflectError::ArgumentCount { expected: 1, got: 0, .. }));

        let err = call(
            |c: &mut Counter, a: i64| c.total = a,
            &mut c,
            vec![Value::new("seven")],
        )
        .unwrap_err();
        match err {
            ReflectError::ArgumentType { index, expected, found, .. } => {
                assert_eq!(index, 0);
                assert_eq!(expected, "i64");
                assert_eq!(found, "&str");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(c.total, 0);
    }
}
