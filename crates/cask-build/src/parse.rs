//! Declarative spec mini-languages.
//!
//! Three fixed-pattern string formats appear in image configuration:
//!
//! - directory specs: `SOURCE in DIR` or `SOURCE at PATH`
//! - volume-from specs: `IMAGE then discard` or `IMAGE then persist to TAG`
//! - link specs: `IMAGE alias ALIAS then discard` or
//!   `IMAGE alias ALIAS then commit to TAG`
//!
//! A non-match is a fatal [`BuildError::InvalidFormat`] naming the offending
//! option, the raw spec text and the owning image.

use crate::disposition::Disposition;
use crate::error::{BuildError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static DIR_SPEC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<source>.+) (?:in (?P<dir>.+)|at (?P<path>.+))$")
        .expect("invalid dir spec pattern")
});

static VOLUME_FROM_SPEC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<image>[^ ]+) then (?:discard|persist to (?P<target>[^ ]+))$")
        .expect("invalid volume-from spec pattern")
});

static LINK_SPEC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<image>[^ ]+) alias (?P<alias>[^ ]+) then (?:discard|commit to (?P<target>[^ ]+))$")
        .expect("invalid link spec pattern")
});

/// Resolved source and destination of a directory spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    /// Source path on the host.
    pub source: PathBuf,
    /// Full destination path in the image.
    pub dest_path: PathBuf,
    /// Directory containing the destination.
    pub dest_dir: PathBuf,
}

/// A parsed volume-from spec: dependency image and its disposition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeFromImage {
    /// Image the auxiliary container is created from.
    pub image: String,
    /// Disposition of the auxiliary container.
    pub disposition: Disposition,
}

/// A parsed link spec: dependency image, alias, disposition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkImage {
    /// Image the auxiliary container is created from.
    pub image: String,
    /// Alias the auxiliary is reachable as from the root.
    pub alias: String,
    /// Disposition of the auxiliary container.
    pub disposition: Disposition,
}

/// Parses `SOURCE in DIR` / `SOURCE at PATH`.
///
/// `in` appends the source's base name to the directory; `at` takes the full
/// path and derives its directory.
///
/// # Errors
///
/// [`BuildError::InvalidFormat`] when the spec does not match or a usable
/// base name / parent directory cannot be derived.
pub fn parse_dir_spec(spec: &str, option: &str, image: &str) -> Result<ResolvedPaths> {
    let captures = DIR_SPEC
        .captures(spec)
        .ok_or_else(|| BuildError::invalid_format(option, spec, image))?;
    let source = PathBuf::from(&captures["source"]);

    let (dest_path, dest_dir) = if let Some(dir) = captures.name("dir") {
        let dest_dir = PathBuf::from(dir.as_str());
        let base = source
            .file_name()
            .ok_or_else(|| BuildError::invalid_format(option, spec, image))?;
        (dest_dir.join(base), dest_dir)
    } else {
        let dest_path = PathBuf::from(&captures["path"]);
        let dest_dir = dest_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| BuildError::invalid_format(option, spec, image))?;
        (dest_path, dest_dir)
    };

    Ok(ResolvedPaths {
        source,
        dest_path,
        dest_dir,
    })
}

/// Parses `IMAGE then discard` / `IMAGE then persist to TAG`.
///
/// # Errors
///
/// [`BuildError::InvalidFormat`] when the spec does not match.
pub fn parse_volume_from_spec(spec: &str, option: &str, image: &str) -> Result<VolumeFromImage> {
    let captures = VOLUME_FROM_SPEC
        .captures(spec)
        .ok_or_else(|| BuildError::invalid_format(option, spec, image))?;
    let disposition = captures
        .name("target")
        .map_or(Disposition::Discard, |t| {
            Disposition::Persist(t.as_str().to_string())
        });
    Ok(VolumeFromImage {
        image: captures["image"].to_string(),
        disposition,
    })
}

/// Parses `IMAGE alias ALIAS then discard` /
/// `IMAGE alias ALIAS then commit to TAG`.
///
/// # Errors
///
/// [`BuildError::InvalidFormat`] when the spec does not match.
pub fn parse_link_spec(spec: &str, option: &str, image: &str) -> Result<LinkImage> {
    let captures = LINK_SPEC
        .captures(spec)
        .ok_or_else(|| BuildError::invalid_format(option, spec, image))?;
    let disposition = captures
        .name("target")
        .map_or(Disposition::Discard, |t| {
            Disposition::Commit(t.as_str().to_string())
        });
    Ok(LinkImage {
        image: captures["image"].to_string(),
        alias: captures["alias"].to_string(),
        disposition,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_spec_in_appends_base_name() {
        let paths = parse_dir_spec("src/app in /opt/app", "lib", "img").unwrap();
        assert_eq!(paths.source, PathBuf::from("src/app"));
        assert_eq!(paths.dest_path, PathBuf::from("/opt/app/app"));
        assert_eq!(paths.dest_dir, PathBuf::from("/opt/app"));
    }

    #[test]
    fn dir_spec_at_takes_full_path() {
        let paths = parse_dir_spec("src/app at /opt/app/run.sh", "run", "img").unwrap();
        assert_eq!(paths.source, PathBuf::from("src/app"));
        assert_eq!(paths.dest_path, PathBuf::from("/opt/app/run.sh"));
        assert_eq!(paths.dest_dir, PathBuf::from("/opt/app"));
    }

    #[test]
    fn dir_spec_rejects_other_shapes() {
        let err = parse_dir_spec("src/app into /opt", "lib", "img").unwrap_err();
        match err {
            BuildError::InvalidFormat {
                option,
                spec,
                image,
            } => {
                assert_eq!(option, "lib");
                assert_eq!(spec, "src/app into /opt");
                assert_eq!(image, "img");
            }
            other => panic!("expected invalid format, got {other}"),
        }
    }

    #[test]
    fn volume_from_discard() {
        let parsed = parse_volume_from_spec("base:latest then discard", "volumes_from", "img")
            .unwrap();
        assert_eq!(parsed.image, "base:latest");
        assert_eq!(parsed.disposition, Disposition::Discard);
    }

    #[test]
    fn volume_from_persist_target_may_carry_tag() {
        let parsed =
            parse_volume_from_spec("base:latest then persist to out:img", "volumes_from", "img")
                .unwrap();
        assert_eq!(parsed.image, "base:latest");
        assert_eq!(parsed.disposition, Disposition::Persist("out:img".to_string()));
    }

    #[test]
    fn volume_from_requires_then() {
        let err = parse_volume_from_spec("base:latest discard", "volumes_from", "img").unwrap_err();
        assert!(matches!(err, BuildError::InvalidFormat { .. }));
        assert!(err.to_string().contains("base:latest discard"));
        assert!(err.to_string().contains("img"));
    }

    #[test]
    fn link_spec_variants() {
        let discard = parse_link_spec("db:5 alias db then discard", "links", "img").unwrap();
        assert_eq!(discard.image, "db:5");
        assert_eq!(discard.alias, "db");
        assert_eq!(discard.disposition, Disposition::Discard);

        let commit = parse_link_spec("db:5 alias db then commit to out:db", "links", "img").unwrap();
        assert_eq!(commit.disposition, Disposition::Commit("out:db".to_string()));
    }

    #[test]
    fn link_spec_requires_alias() {
        let err = parse_link_spec("db:5 then discard", "links", "img").unwrap_err();
        assert!(matches!(err, BuildError::InvalidFormat { .. }));
    }
}
