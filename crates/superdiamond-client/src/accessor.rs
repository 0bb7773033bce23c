//! Typed reads over the live store.
//!
//! Every read resolves `${key}` placeholders first, then converts. A missing
//! key and a value that does not convert are distinct errors.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::client::ConfigClient;
use crate::interpolate::interpolate;
use crate::store::VersionedStore;

/// Errors raised by configuration reads.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessError {
    /// The key is not present.
    #[error("'{key}' doesn't map to an existing value")]
    MissingKey {
        /// Requested key.
        key: String,
    },
    /// The value is present but is not of the requested type.
    #[error("'{key}' doesn't map to a {target} value: '{value}'")]
    Conversion {
        /// Requested key.
        key: String,
        /// Name of the requested type.
        target: &'static str,
        /// Value after placeholder resolution.
        value: String,
    },
    /// Placeholder resolution looped back on itself.
    #[error("'{key}' contains a cyclic reference through '${{{reference}}}'")]
    CyclicReference {
        /// Requested key.
        key: String,
        /// Key at which the cycle was detected.
        reference: String,
    },
}

impl AccessError {
    /// Whether the key was absent.
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::MissingKey { .. })
    }

    /// Whether the value failed to convert.
    #[must_use]
    pub const fn is_conversion(&self) -> bool {
        matches!(self, Self::Conversion { .. })
    }
}

/// Types a configuration value can be read as.
pub trait FromConfigValue: Sized {
    /// Name used in conversion errors.
    const TYPE_NAME: &'static str;

    /// Converts a resolved value, or returns `None` when it does not fit.
    fn from_config_value(value: &str) -> Option<Self>;
}

impl FromConfigValue for String {
    const TYPE_NAME: &'static str = "string";

    fn from_config_value(value: &str) -> Option<Self> {
        Some(value.to_owned())
    }
}

impl FromConfigValue for bool {
    const TYPE_NAME: &'static str = "boolean";

    fn from_config_value(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "y" | "t" => Some(true),
            "false" | "no" | "off" | "n" | "f" => Some(false),
            _ => None,
        }
    }
}

macro_rules! integer_value {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl FromConfigValue for $ty {
                const TYPE_NAME: &'static str = $name;

                fn from_config_value(value: &str) -> Option<Self> {
                    parse_integer(value).and_then(|parsed| <$ty>::try_from(parsed).ok())
                }
            }
        )*
    };
}

integer_value!(i8 => "byte", i16 => "short", i32 => "int", i64 => "long");

impl FromConfigValue for f32 {
    const TYPE_NAME: &'static str = "float";

    fn from_config_value(value: &str) -> Option<Self> {
        value.trim().parse().ok()
    }
}

impl FromConfigValue for f64 {
    const TYPE_NAME: &'static str = "double";

    fn from_config_value(value: &str) -> Option<Self> {
        value.trim().parse().ok()
    }
}

/// Parses a signed decimal, `0x` hexadecimal or `0b` binary integer.
fn parse_integer(value: &str) -> Option<i128> {
    let text = value.trim();
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if unsigned.starts_with(['+', '-']) {
        return None;
    }
    let magnitude = if let Some(hex) = strip_radix_prefix(unsigned, 'x') {
        i128::from_str_radix(hex, 16).ok()?
    } else if let Some(binary) = strip_radix_prefix(unsigned, 'b') {
        i128::from_str_radix(binary, 2).ok()?
    } else {
        unsigned.parse::<i128>().ok()?
    };
    Some(if negative { -magnitude } else { magnitude })
}

fn strip_radix_prefix(text: &str, marker: char) -> Option<&str> {
    let rest = text.strip_prefix('0')?;
    rest.strip_prefix(marker)
        .or_else(|| rest.strip_prefix(marker.to_ascii_uppercase()))
        .filter(|digits| !digits.starts_with(['+', '-']))
}

fn resolved(store: &VersionedStore, key: &str) -> Result<Option<String>, AccessError> {
    store
        .get(key)
        .map(|raw| interpolate(key, &raw, &|name: &str| store.get(name)))
        .transpose()
}

fn convert<T: FromConfigValue>(key: &str, value: String) -> Result<T, AccessError> {
    T::from_config_value(&value).ok_or_else(|| AccessError::Conversion {
        key: key.to_owned(),
        target: T::TYPE_NAME,
        value,
    })
}

macro_rules! typed_getters {
    ($($ty:ty => $get:ident, $get_or:ident);* $(;)?) => {
        $(
            #[doc = concat!("Reads `key` as `", stringify!($ty), "`.")]
            pub fn $get(&self, key: &str) -> Result<$ty, AccessError> {
                self.get(key)
            }

            #[doc = concat!("Reads `key` as `", stringify!($ty), "`, or `default` when absent.")]
            pub fn $get_or(&self, key: &str, default: $ty) -> Result<$ty, AccessError> {
                self.get_or(key, default)
            }
        )*
    };
}

impl ConfigClient {
    /// Reads `key` as `T`.
    pub fn get<T: FromConfigValue>(&self, key: &str) -> Result<T, AccessError> {
        let value = resolved(&self.shared.store, key)?.ok_or_else(|| AccessError::MissingKey {
            key: key.to_owned(),
        })?;
        convert(key, value)
    }

    /// Reads `key` as `T`, or returns `default` when the key is absent.
    ///
    /// A present value that does not convert is still an error.
    pub fn get_or<T: FromConfigValue>(&self, key: &str, default: T) -> Result<T, AccessError> {
        match resolved(&self.shared.store, key)? {
            Some(value) => convert(key, value),
            None => Ok(default),
        }
    }

    /// Reads `key` as a string.
    pub fn get_string(&self, key: &str) -> Result<String, AccessError> {
        self.get(key)
    }

    /// Reads `key` as a string; when absent, resolves placeholders in `default`.
    pub fn get_string_or(&self, key: &str, default: &str) -> Result<String, AccessError> {
        let store = &self.shared.store;
        match resolved(store, key)? {
            Some(value) => Ok(value),
            None => interpolate(key, default, &|name: &str| store.get(name)),
        }
    }

    typed_getters! {
        i32 => get_int, get_int_or;
        i64 => get_long, get_long_or;
        f64 => get_double, get_double_or;
        f32 => get_float, get_float_or;
        bool => get_boolean, get_boolean_or;
        i8 => get_byte, get_byte_or;
        i16 => get_short, get_short_or;
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.shared.store.get(key).is_some()
    }

    /// Raw values of every key under `<module>.`.
    ///
    /// `None` only while the store holds no keys at all; a loaded store with
    /// nothing under `module` yields an empty list.
    #[must_use]
    pub fn get_list_by_module(&self, module: &str) -> Option<Vec<String>> {
        let store = &self.shared.store;
        (!store.is_empty()).then(|| store.values_with_prefix(module))
    }

    /// Copy of every key with placeholders resolved, sorted by key.
    pub fn properties(&self) -> Result<BTreeMap<String, String>, AccessError> {
        let store = &self.shared.store;
        store
            .to_map()
            .into_iter()
            .map(|(key, raw)| {
                let value = interpolate(&key, &raw, &|name: &str| store.get(name))?;
                Ok((key, value))
            })
            .collect()
    }

    /// Copy of every key with its raw, unresolved value.
    #[must_use]
    pub fn raw_properties(&self) -> BTreeMap<String, String> {
        self.shared.store.to_map()
    }
}
