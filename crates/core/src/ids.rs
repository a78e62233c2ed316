use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(ProjectRefid);
string_id!(BaseTxnId);

impl BaseTxnId {
    /// Token registered for a freshly initialized project.
    pub const INITIAL: &'static str = "0";

    pub fn initial() -> Self {
        Self::new(Self::INITIAL)
    }

    /// A token for the state after a newly accepted commit.
    ///
    /// UUIDv7 values are unique and sort by creation time, so two commits on
    /// the same project never share a token even within one millisecond.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_distinct_from_initial_and_each_other() {
        let a = BaseTxnId::generate();
        let b = BaseTxnId::generate();
        assert_ne!(a, b);
        assert_ne!(a, BaseTxnId::initial());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = ProjectRefid::from("gantt-42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"gantt-42\"");
        let back: ProjectRefid = serde_json::from_str("\"gantt-42\"").unwrap();
        assert_eq!(back, id);
    }
}
