//! StreamIdentifier (§4.2): classify an opaque byte stream, optionally
//! hinted by a filename extension, as an archive, disk image, or neither.
//!
//! The core does not itself know any concrete format; it calls a list of
//! registered probes in order and takes the first that recognizes the
//! stream. Real format plug-ins register probes at startup; `testkit`
//! registers fakes for tests.

use crate::error::{Error, Result};
use crate::traits::{Archive, DiskImage};
use std::io::{Read, Seek, SeekFrom};

/// What a stream turned out to be, before any partition/filesystem
/// analysis has run on a recognized disk image.
pub enum Identified {
    Archive(Box<dyn Archive>),
    DiskImage(Box<dyn DiskImage>),
    None,
}

/// A hint carried alongside identification results: whether the stream's
/// byte order matters to callers that need to know before reading further
/// (e.g. sector interleave), and whether the identifying probe determined
/// the content must be treated as read-only.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentifyHints {
    pub order_hint: Option<&'static str>,
    pub readonly_hint: bool,
}

pub struct IdentifyResult {
    pub content: Identified,
    pub hints: IdentifyHints,
}

/// One format probe: given a rewound, seekable stream and an optional
/// extension hint, attempt to recognize it. Returns `Ok(None)` (not an
/// error) when the probe simply doesn't match.
pub trait Probe: Send + Sync {
    fn name(&self) -> &'static str;

    /// Extensions this probe should be tried first for, e.g. `["shk"]`.
    /// Used only to reorder probes, never to skip them.
    fn extension_hints(&self) -> &'static [&'static str] {
        &[]
    }

    fn probe(
        &self,
        stream: &mut dyn ReadSeekStream,
        label: &str,
    ) -> Result<Option<(Identified, IdentifyHints)>>;
}

pub trait ReadSeekStream: Read + Seek {}
impl<T: Read + Seek> ReadSeekStream for T {}

/// An ordered set of probes, consulted most-specific-first per the
/// extension hint, then in registration order.
#[derive(Default)]
pub struct ProbeRegistry {
    probes: Vec<Box<dyn Probe>>,
}

impl ProbeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, probe: Box<dyn Probe>) {
        self.probes.push(probe);
    }

    fn ordered_for_hint<'a>(&'a self, ext_hint: Option<&str>) -> Vec<&'a dyn Probe> {
        let mut preferred = Vec::new();
        let mut rest = Vec::new();
        for probe in &self.probes {
            let matches_hint = ext_hint
                .map(|ext| {
                    probe
                        .extension_hints()
                        .iter()
                        .any(|hint| hint.eq_ignore_ascii_case(ext))
                })
                .unwrap_or(false);
            if matches_hint {
                preferred.push(probe.as_ref());
            } else {
                rest.push(probe.as_ref());
            }
        }
        preferred.extend(rest);
        preferred
    }

    /// Run every registered probe in order, rewinding the stream between
    /// attempts, and return the first recognized result.
    pub fn identify(
        &self,
        stream: &mut dyn ReadSeekStream,
        ext_hint: Option<&str>,
        label: &str,
    ) -> Result<IdentifyResult> {
        for probe in self.ordered_for_hint(ext_hint) {
            stream.seek(SeekFrom::Start(0)).map_err(|e| Error::Io {
                path: std::path::PathBuf::from(label),
                source: e,
            })?;

            match probe.probe(stream, label) {
                Ok(Some((content, hints))) => return Ok(IdentifyResult { content, hints }),
                Ok(None) => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(IdentifyResult {
            content: Identified::None,
            hints: IdentifyHints::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct AlwaysNone;
    impl Probe for AlwaysNone {
        fn name(&self) -> &'static str {
            "always-none"
        }
        fn probe(
            &self,
            _stream: &mut dyn ReadSeekStream,
            _label: &str,
        ) -> Result<Option<(Identified, IdentifyHints)>> {
            Ok(None)
        }
    }

    #[test]
    fn no_matching_probe_yields_none() {
        let registry = ProbeRegistry::new();
        let mut cursor = Cursor::new(vec![0u8; 16]);
        let result = registry.identify(&mut cursor, None, "test").unwrap();
        assert!(matches!(result.content, Identified::None));
    }

    #[test]
    fn skips_non_matching_probes_in_order() {
        let mut registry = ProbeRegistry::new();
        registry.register(Box::new(AlwaysNone));
        registry.register(Box::new(AlwaysNone));
        let mut cursor = Cursor::new(vec![1, 2, 3]);
        let result = registry.identify(&mut cursor, Some("shk"), "test").unwrap();
        assert!(matches!(result.content, Identified::None));
    }
}
