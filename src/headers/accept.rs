use super::error::HeaderError;
use super::{HeaderValue, MediaRange};

/// Decoded `Accept` header: media ranges in preference order.
///
/// Ranges are sorted best first: higher quality wins, ties broken by
/// range specificity, then by declaration order.
#[derive(Debug, Clone)]
pub struct Accept {
    ranges: Vec<MediaRange>,
}

impl Accept {
    /// The `*/*` accept list, used when the request carries no `Accept`.
    pub fn any() -> Accept {
        Self {
            ranges: vec![MediaRange::any()],
        }
    }

    /// Parse and order the ranges of every `Accept` value of a request.
    pub fn from_values<'a>(
        values: impl Iterator<Item = &'a HeaderValue>,
    ) -> Result<Accept, HeaderError> {
        let mut ranges = Vec::new();
        for value in values {
            let raw = value.to_str().ok_or(HeaderError::Codec("accept"))?;
            for part in raw.split(',') {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                ranges.push(MediaRange::parse(part)?);
            }
        }
        if ranges.is_empty() {
            return Ok(Self::any());
        }
        // stable sort keeps declaration order for full ties
        ranges.sort_by(|a, b| {
            b.q()
                .cmp(&a.q())
                .then_with(|| b.specificity().cmp(&a.specificity()))
        });
        Ok(Self { ranges })
    }

    /// Ranges in preference order, best first.
    #[inline]
    pub fn ranges(&self) -> &[MediaRange] {
        &self.ranges
    }
}

impl Default for Accept {
    #[inline]
    fn default() -> Self {
        Self::any()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accept(raw: &'static str) -> Accept {
        let value = HeaderValue::from_static(raw);
        Accept::from_values(std::iter::once(&value)).unwrap()
    }

    #[test]
    fn ordering() {
        let accept = accept("text/*;q=0.5, text/html, */*;q=0.1, application/json;q=0.9");
        let ordered: Vec<String> = accept.ranges().iter().map(|r| r.to_string()).collect();
        assert_eq!(
            ordered,
            ["text/html", "application/json", "text/*", "*/*"]
        );
    }

    #[test]
    fn specificity_breaks_quality_ties() {
        let accept = accept("*/*, text/plain, text/*");
        let ordered: Vec<String> = accept.ranges().iter().map(|r| r.to_string()).collect();
        assert_eq!(ordered, ["text/plain", "text/*", "*/*"]);
    }

    #[test]
    fn quality_outranks_specificity() {
        // the quality value is the primary key: a more specific range
        // with a lower q loses to a broader range with a higher q
        let accept = accept("text/plain;q=0.4, text/*;q=0.9");
        let ordered: Vec<String> = accept.ranges().iter().map(|r| r.to_string()).collect();
        assert_eq!(ordered, ["text/*", "text/plain"]);
    }

    #[test]
    fn empty_means_any() {
        let accept = Accept::from_values(std::iter::empty()).unwrap();
        assert_eq!(accept.ranges().len(), 1);
        assert_eq!(accept.ranges()[0].specificity(), 0);
    }
}
