//! Declarative macros generating [`Node`](crate::Node) descriptors.

/// Declare a struct as a config record.
///
/// Each listed member gets a raw annotation string. Visibility is repeated
/// from the struct definition: private members are skipped unless marked
/// `#[embed]`. The struct must implement `Default`.
///
/// ```
/// use std::time::Duration;
///
/// #[derive(Debug, Default)]
/// pub struct Server {
///     pub host: String,
///     pub ports: Vec<u16>,
///     pub cleanup: Duration,
///     pub logger: Logger,
/// }
///
/// #[derive(Debug, Default)]
/// pub struct Logger {
///     pub level: String,
/// }
///
/// fig::record!(Server {
///     pub host => r#"fig:"host" default:"127.0.0.1""#,
///     pub ports => r#"fig:"ports,default=[80,443]""#,
///     pub cleanup => r#"fig:"cleanup" default:"30m""#,
///     pub logger => r#"fig:"logger""#,
/// });
/// fig::record!(Logger {
///     pub level => r#"fig:"level" validate:"required""#,
/// });
/// ```
#[macro_export]
macro_rules! record {
    ($ty:ty { $( $(#[$marker:ident])* $vis:vis $field:ident => $tag:literal ),* $(,)? }) => {
        impl $crate::Node for $ty {
            fn kind(&self) -> $crate::Kind {
                $crate::Kind::Record
            }

            fn kind_of() -> $crate::Kind {
                $crate::Kind::Record
            }

            fn zeroed() -> ::core::option::Option<Self> {
                ::core::option::Option::Some(<$ty as ::core::default::Default>::default())
            }

            fn is_zero(&self) -> bool {
                false
            }

            fn as_record(&self) -> ::core::option::Option<&dyn $crate::Record> {
                ::core::option::Option::Some(self)
            }

            fn as_record_mut(&mut self) -> ::core::option::Option<&mut dyn $crate::Record> {
                ::core::option::Option::Some(self)
            }
        }

        impl $crate::Record for $ty {
            fn fields(&self) -> &'static [$crate::FieldDef] {
                const FIELDS: &[$crate::FieldDef] = &[
                    $(
                        $crate::FieldDef {
                            name: stringify!($field),
                            tag: $tag,
                            public: !stringify!($vis).is_empty(),
                            embedded: $crate::__record_embedded!($($marker)*),
                        },
                    )*
                ];
                FIELDS
            }

            #[allow(unused_assignments, unused_mut, unused_variables)]
            fn field(&self, index: usize) -> ::core::option::Option<&dyn $crate::Node> {
                let mut position = 0usize;
                $(
                    if position == index {
                        return ::core::option::Option::Some(&self.$field as &dyn $crate::Node);
                    }
                    position += 1;
                )*
                ::core::option::Option::None
            }

            #[allow(unused_assignments, unused_mut, unused_variables)]
            fn field_mut(&mut self, index: usize) -> ::core::option::Option<&mut dyn $crate::Node> {
                let mut position = 0usize;
                $(
                    if position == index {
                        return ::core::option::Option::Some(&mut self.$field as &mut dyn $crate::Node);
                    }
                    position += 1;
                )*
                ::core::option::Option::None
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __record_embedded {
    () => {
        false
    };
    (embed $($rest:ident)*) => {
        true
    };
    ($other:ident $($rest:ident)*) => {
        compile_error!(concat!(
            "unknown record member marker `",
            stringify!($other),
            "`, expected `embed`"
        ))
    };
}

/// Declare types that coerce from strings through their `FromStr` impl.
///
/// The parse runs before any kind-based rule, for env values, defaults and
/// string values in config files alike. Types must implement `Default` and
/// `PartialEq`; the default value is the zero value.
///
/// ```
/// use std::str::FromStr;
///
/// #[derive(Debug, Default, PartialEq)]
/// pub enum Listener {
///     #[default]
///     Unix,
///     Tcp,
/// }
///
/// impl FromStr for Listener {
///     type Err = String;
///
///     fn from_str(s: &str) -> Result<Self, Self::Err> {
///         match s.to_ascii_lowercase().as_str() {
///             "unix" => Ok(Listener::Unix),
///             "tcp" => Ok(Listener::Tcp),
///             other => Err(format!("unknown listener type: {other}")),
///         }
///     }
/// }
///
/// fig::string_unmarshaler!(Listener);
/// ```
#[macro_export]
macro_rules! string_unmarshaler {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Node for $ty {
                fn kind(&self) -> $crate::Kind {
                    $crate::Kind::Custom
                }

                fn kind_of() -> $crate::Kind {
                    $crate::Kind::Custom
                }

                fn zeroed() -> ::core::option::Option<Self> {
                    ::core::option::Option::Some(<$ty as ::core::default::Default>::default())
                }

                fn is_zero(&self) -> bool {
                    *self == <$ty as ::core::default::Default>::default()
                }

                fn as_unmarshaler(
                    &mut self,
                ) -> ::core::option::Option<&mut dyn $crate::StringUnmarshaler> {
                    ::core::option::Option::Some(self)
                }
            }
        )+
    };
}
