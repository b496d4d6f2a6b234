//! Conversion Module
//!
//! Turns stored values into the types callers ask for. A conversion either
//! produces a value of the target type or fails with `None`.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::CachedValue;

// == Target Type ==
/// Describes the type a stored value should be converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetType {
    id: TypeId,
    name: &'static str,
}

impl TargetType {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// == Conversion Service ==
/// Converts any stored value to any target type, or reports failure.
///
/// Shared by every cache as `Arc<dyn ConversionService>` and called from
/// many threads at once. Implementations must be free of side effects.
///
/// A successful conversion must return a value whose concrete type is the
/// one `target` describes. Plain functions and closures of the right shape
/// are conversion services too.
pub trait ConversionService: Send + Sync {
    fn convert(&self, value: &CachedValue, target: &TargetType) -> Option<CachedValue>;
}

impl<F> ConversionService for F
where
    F: Fn(&CachedValue, &TargetType) -> Option<CachedValue> + Send + Sync,
{
    fn convert(&self, value: &CachedValue, target: &TargetType) -> Option<CachedValue> {
        self(value, target)
    }
}

/// Registers range-checked conversions between every pair of integer types.
macro_rules! register_integer_conversions {
    ($service:ident; $($source:ty),*) => {
        $(
            register_integer_conversions!(@targets $service; $source; i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
        )*
    };
    (@targets $service:ident; $source:ty; $($target:ty),*) => {
        $(
            $service.add_converter(|v: &$source| <$target>::try_from(*v).ok());
        )*
    };
}

/// Registers `to_string` and `parse` conversions for each type.
macro_rules! register_string_conversions {
    ($service:ident; $($ty:ty),*) => {
        $(
            $service.add_converter(|v: &$ty| Some(v.to_string()));
            $service.add_converter(|v: &String| v.trim().parse::<$ty>().ok());
            $service.add_converter(|v: &&'static str| v.trim().parse::<$ty>().ok());
        )*
    };
}

type Converter = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> Option<CachedValue> + Send + Sync>;

// == Default Conversion Service ==
/// Identity conversion plus a registry of converters keyed by
/// (source type, target type).
#[derive(Clone)]
pub struct DefaultConversionService {
    converters: HashMap<(TypeId, TypeId), Converter>,
}

impl DefaultConversionService {
    /// Creates a service with the common scalar conversions registered:
    /// range-checked integer conversions, scalars to `String`, and string
    /// parsing back to scalars.
    pub fn new() -> Self {
        let mut service = Self::empty();
        register_integer_conversions!(service; i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
        register_string_conversions!(service; i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char);
        service.add_converter(|v: &f32| Some(f64::from(*v)));
        service.add_converter(|v: &&'static str| Some(v.to_string()));
        service
    }

    /// Creates a service that only performs identity conversions.
    pub fn empty() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    // == Registration ==
    /// Registers a conversion from `S` to `T`, replacing any previous one.
    pub fn add_converter<S, T, F>(&mut self, converter: F) -> &mut Self
    where
        S: Any + Send + Sync,
        T: Any + Send + Sync,
        F: Fn(&S) -> Option<T> + Send + Sync + 'static,
    {
        let erased: Converter = Arc::new(move |value: &(dyn Any + Send + Sync)| {
            let source = value.downcast_ref::<S>()?;
            converter(source).map(|target| Arc::new(target) as CachedValue)
        });
        self.converters
            .insert((TypeId::of::<S>(), TypeId::of::<T>()), erased);
        self
    }

    pub fn with_converter<S, T, F>(mut self, converter: F) -> Self
    where
        S: Any + Send + Sync,
        T: Any + Send + Sync,
        F: Fn(&S) -> Option<T> + Send + Sync + 'static,
    {
        self.add_converter(converter);
        self
    }

    /// Registers deserialization of stored `serde_json::Value`s into `T`.
    pub fn add_json_target<T>(&mut self) -> &mut Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        self.add_converter(|value: &serde_json::Value| serde_json::from_value::<T>(value.clone()).ok())
    }

    /// Registers serialization of stored `S` values into `serde_json::Value`.
    pub fn add_json_source<S>(&mut self) -> &mut Self
    where
        S: Serialize + Send + Sync + 'static,
    {
        self.add_converter(|value: &S| serde_json::to_value(value).ok())
    }

    /// Returns true if a value of type `S` can be converted to `T`.
    pub fn can_convert<S: 'static, T: 'static>(&self) -> bool {
        TypeId::of::<S>() == TypeId::of::<T>()
            || self
                .converters
                .contains_key(&(TypeId::of::<S>(), TypeId::of::<T>()))
    }
}

impl ConversionService for DefaultConversionService {
    fn convert(&self, value: &CachedValue, target: &TargetType) -> Option<CachedValue> {
        let source = (**value).type_id();
        if source == target.id() {
            return Some(Arc::clone(value));
        }

        let converter = self.converters.get(&(source, target.id()))?;
        converter(&**value)
    }
}

impl Default for DefaultConversionService {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DefaultConversionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultConversionService")
            .field("converters", &self.converters.len())
            .finish()
    }
}
