/// Declares a struct together with its `Entity` implementation.
///
/// Field attributes:
/// - `#[column(key)]` marks the primary key (exactly one field),
/// - `#[column(index)]` maintains a secondary index for the field,
/// - `#[relation("family")]` / `#[relation(many = "family")]` mark a
///   relationship holding one row key (`String`) or several (`Vec<String>`).
///
/// Attribute and column names equal the field name. The struct derives
/// `Debug`, `Clone`, `Default` and `PartialEq`.
///
/// ```ignore
/// colmapper::column_entity! {
///     pub struct User in "users" {
///         #[column(key)]
///         pub id: String,
///         #[column(index)]
///         pub email: String,
///         pub age: i64,
///     }
/// }
/// ```
#[macro_export]
macro_rules! column_entity {
    (
        $(#[$struct_meta:meta])*
        $vis:vis struct $name:ident in $family:literal {
            $( $(#[$($field_meta:tt)*])* $field_vis:vis $field:ident : $field_ty:ty ),+ $(,)?
        }
    ) => {
        $(#[$struct_meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        $vis struct $name {
            $( $field_vis $field: $field_ty, )+
        }

        impl $crate::entity::Entity for $name {
            fn descriptor() -> $crate::metadata::EntityDescriptor {
                $crate::metadata::EntityDescriptor::new(stringify!($name), $family)
                $(
                    .attribute(
                        $crate::metadata::AttributeDescriptor::new(
                            stringify!($field),
                            <$field_ty as $crate::entity::ColumnValue>::semantic_type(),
                        )
                        .primary_key_if($crate::__column_field_is_key!($(#[$($field_meta)*])*))
                        .indexed_if($crate::__column_field_is_indexed!($(#[$($field_meta)*])*))
                        .relation_if($crate::__column_field_relation!($(#[$($field_meta)*])*)),
                    )
                )+
            }

            fn metadata_slot() -> &'static $crate::metadata::MetadataSlot {
                static SLOT: $crate::metadata::MetadataSlot = $crate::metadata::MetadataSlot::new();
                &SLOT
            }

            fn attribute(&self, name: &str) -> Option<$crate::core::Value> {
                match name {
                    $(
                        stringify!($field) => {
                            Some($crate::entity::ColumnValue::to_value(&self.$field))
                        }
                    )+
                    _ => None,
                }
            }

            fn set_attribute(
                &mut self,
                name: &str,
                value: $crate::core::Value,
            ) -> $crate::core::Result<()> {
                match name {
                    $(
                        stringify!($field) => {
                            self.$field =
                                <$field_ty as $crate::entity::ColumnValue>::from_value(value)?;
                            Ok(())
                        }
                    )+
                    other => Err($crate::core::DbError::Metadata(format!(
                        "{} has no attribute '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! __column_args_contain_key {
    () => {
        false
    };
    (key $(, $($rest:tt)*)?) => {
        true
    };
    ($_head:tt $(, $($rest:tt)*)?) => {
        $crate::__column_args_contain_key!($($($rest)*)?)
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! __column_args_contain_index {
    () => {
        false
    };
    (index $(, $($rest:tt)*)?) => {
        true
    };
    ($_head:tt $(, $($rest:tt)*)?) => {
        $crate::__column_args_contain_index!($($($rest)*)?)
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! __column_field_is_key {
    () => {
        false
    };
    (#[column($($args:tt)*)] $($rest:tt)*) => {
        $crate::__column_args_contain_key!($($args)*) || $crate::__column_field_is_key!($($rest)*)
    };
    (#[ $($_other:tt)* ] $($rest:tt)*) => {
        $crate::__column_field_is_key!($($rest)*)
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! __column_field_is_indexed {
    () => {
        false
    };
    (#[column($($args:tt)*)] $($rest:tt)*) => {
        $crate::__column_args_contain_index!($($args)*) || $crate::__column_field_is_indexed!($($rest)*)
    };
    (#[ $($_other:tt)* ] $($rest:tt)*) => {
        $crate::__column_field_is_indexed!($($rest)*)
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! __column_field_relation {
    () => {
        None
    };
    (#[relation(many = $target:literal)] $($rest:tt)*) => {
        Some(($target, $crate::metadata::RelationKind::Many))
    };
    (#[relation($target:literal)] $($rest:tt)*) => {
        Some(($target, $crate::metadata::RelationKind::One))
    };
    (#[ $($_other:tt)* ] $($rest:tt)*) => {
        $crate::__column_field_relation!($($rest)*)
    };
}
