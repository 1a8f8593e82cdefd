// SPDX-License-Identifier: MIT

#[macro_export]
/// Defines the table of known GPT partition types used for alias lookup and display.
///
/// This macro generates:
/// - A constant [`Guid`](crate::guid::Guid) for each partition type.
/// - An enum `PartitionKind` with one variant per type and an `Unknown` variant for other GUIDs.
/// - Conversions between GUIDs, short aliases (`kernel`, `efi`, ...) and `PartitionKind`.
/// - A `Display` implementation printing the descriptive name.
///
/// # Example
/// ```rust
/// use rimgpt::define_partition_types;
/// use rimgpt::guid::Guid;
///
/// define_partition_types! {
///     Efi => "efi", "EFI System Partition",
///         Guid::from_fields(0xC12A7328, 0xF81F, 0x11D2, [0xBA, 0x4B, 0x00, 0xA0, 0xC9, 0x3E, 0xC9, 0x3B]),
/// }
///
/// assert_eq!(PartitionKind::from_alias("EFI"), Some(PartitionKind::Efi));
/// ```
///
/// # Parameters
/// - `$name`: Identifier for the partition type (enum variant and constant names).
/// - `$alias`: Lower-case short name accepted on the command line.
/// - `$desc`: Descriptive name shown by `show`.
/// - `$guid`: The type GUID.
///
/// # Note
/// Identifiers are built with the `paste` crate, re-exported by this crate.
macro_rules! define_partition_types {
    (
        $(
            $name:ident => $alias:expr, $desc:expr, $guid:expr
        ),+ $(,)?
    ) => {
        $crate::paste::paste! {
            $(
                #[doc = $desc]
                pub const [<TYPE_GUID_ $name:upper>]: $crate::guid::Guid = $guid;
            )+

            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub enum PartitionKind {
                $($name,)+
                Unknown($crate::guid::Guid),
            }

            impl PartitionKind {
                pub fn from_guid(guid: &$crate::guid::Guid) -> Self {
                    match guid {
                        $(g if *g == [<TYPE_GUID_ $name:upper>] => Self::$name,)+
                        other => Self::Unknown(*other),
                    }
                }

                pub fn as_guid(&self) -> $crate::guid::Guid {
                    match self {
                        $(Self::$name => [<TYPE_GUID_ $name:upper>],)+
                        Self::Unknown(guid) => *guid,
                    }
                }

                /// Case-insensitive alias lookup.
                pub fn from_alias(alias: &str) -> Option<Self> {
                    let alias = alias.to_ascii_lowercase();
                    match alias.as_str() {
                        $(a if a == $alias => Some(Self::$name),)+
                        _ => None,
                    }
                }

                pub fn description(&self) -> Option<&'static str> {
                    match self {
                        $(Self::$name => Some($desc),)+
                        Self::Unknown(_) => None,
                    }
                }
            }

            impl core::fmt::Display for PartitionKind {
                fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                    match self.description() {
                        Some(desc) => f.write_str(desc),
                        None => write!(f, "{}", self.as_guid()),
                    }
                }
            }
        }
    };
}
