use core::fmt;
use url::Url;

const SEP: char = '/';

/// Absolute endpoint URL built up from an API base.
#[derive(Clone, Debug)]
pub struct Resource {
    url: Url,
}

impl Resource {
    /// Parses an absolute base URI. URIs that cannot carry a path
    /// (e.g. `mailto:`) are rejected.
    pub fn new(uri: &str) -> Result<Resource, url::ParseError> {
        let url = Url::parse(uri)?;
        if url.cannot_be_a_base() {
            return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase);
        }
        Ok(Resource { url })
    }

    /// Appends a slash separated path. Empty fragments are skipped and a
    /// trailing slash is kept when `path` has one.
    pub fn append_path(&mut self, path: &str) -> &mut Self {
        if let Ok(mut segments) = self.url.path_segments_mut() {
            segments.pop_if_empty();
            segments.extend(path.split(SEP).filter(|x| !x.is_empty()));
            if path.ends_with(SEP) {
                segments.push("");
            }
        }
        self
    }

    /// Appends exactly one segment, percent-encoding anything (slashes
    /// included) that is not allowed inside a path segment.
    pub fn append_segment(&mut self, segment: &str) -> &mut Self {
        if let Ok(mut segments) = self.url.path_segments_mut() {
            segments.pop_if_empty().push(segment);
        }
        self
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}
