//! The per-application "hook" (§5 "Shared resources"): carries logging and
//! configuration, read-only from the core's perspective once constructed.
//! Not a config *loader* — loading configuration files is named out of
//! scope in §1 — just the narrow struct the core is handed and consults.

/// Whether the resolver consumes a simple-wrapper component implicitly
/// (§4.4): gzip, single-disk NuFX, and similar formats skip straight to
/// their inner disk when this is true.
#[derive(Clone, Copy, Debug)]
pub struct Hook {
    skip_simple: bool,
    is_dir_ok: bool,
}

impl Hook {
    pub fn new() -> Self {
        Self {
            skip_simple: true,
            is_dir_ok: false,
        }
    }

    pub fn with_skip_simple(mut self, skip_simple: bool) -> Self {
        self.skip_simple = skip_simple;
        self
    }

    pub fn with_dir_ok(mut self, is_dir_ok: bool) -> Self {
        self.is_dir_ok = is_dir_ok;
        self
    }

    pub fn skip_simple(&self) -> bool {
        self.skip_simple
    }

    pub fn is_dir_ok(&self) -> bool {
        self.is_dir_ok
    }
}

impl Default for Hook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Hook {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Hook", 2)?;
        state.serialize_field("skip_simple", &self.skip_simple)?;
        state.serialize_field("is_dir_ok", &self.is_dir_ok)?;
        state.end()
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Hook {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        struct Raw {
            #[serde(default = "default_true")]
            skip_simple: bool,
            #[serde(default)]
            is_dir_ok: bool,
        }
        fn default_true() -> bool {
            true
        }

        let raw = Raw::deserialize(deserializer)?;
        Ok(Hook {
            skip_simple: raw.skip_simple,
            is_dir_ok: raw.is_dir_ok,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_skips_simple_wrappers() {
        let hook = Hook::new();
        assert!(hook.skip_simple());
        assert!(!hook.is_dir_ok());
    }

    #[test]
    fn builder_overrides_fields() {
        let hook = Hook::new().with_skip_simple(false).with_dir_ok(true);
        assert!(!hook.skip_simple());
        assert!(hook.is_dir_ok());
    }
}
