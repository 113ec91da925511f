use fadebin_common::{
    CreatePasteRequest, Number, DEFAULT_TITLE, MAX_CONTENT_BYTES, MAX_EXPIRES_IN_HOURS,
    MAX_TITLE_CHARS, MAX_VIEWS_LIMIT,
};

/// A creation request that passed every structural check.
#[derive(Debug, PartialEq, Eq)]
pub struct ValidPaste {
    pub title: String,
    pub content: String,
    pub expires_in: Option<u32>,
    pub max_views: Option<u32>,
}

/// Reads a JSON number as a whole number. `2.0` counts, `1.5` does not.
/// Whole values outside of `i64` saturate, which the bounds checks reject.
#[allow(clippy::cast_possible_truncation)]
fn whole_number(number: &Number) -> Option<i64> {
    number.as_i64().or_else(|| {
        number
            .as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

/// Checks a creation request, reporting the first violated bound.
pub fn validate(request: CreatePasteRequest) -> Result<ValidPaste, &'static str> {
    let CreatePasteRequest {
        content,
        title,
        expires_in,
        max_views,
    } = request;

    if content.is_empty() {
        return Err("Content cannot be empty");
    }
    if content.len() > MAX_CONTENT_BYTES {
        return Err("Content too large (max 10MB)");
    }

    let title = title.unwrap_or_default();
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err("Title too long");
    }

    let expires_in = expires_in
        .map(|hours| whole_number(&hours).ok_or("Expiration must be an integer"))
        .transpose()?
        .map(|hours| match hours {
            h if h <= 0 => Err("Expiration must be positive"),
            h if h > MAX_EXPIRES_IN_HOURS => Err("Max expiration is 1 year (8760 hours)"),
            h => u32::try_from(h).map_err(|_| "Max expiration is 1 year (8760 hours)"),
        })
        .transpose()?;

    let max_views = max_views
        .map(|views| whole_number(&views).ok_or("Max views must be an integer"))
        .transpose()?
        .map(|views| match views {
            v if v <= 0 => Err("Max views must be positive"),
            v if v > MAX_VIEWS_LIMIT => Err("Max views cannot exceed 1,000,000"),
            v => u32::try_from(v).map_err(|_| "Max views cannot exceed 1,000,000"),
        })
        .transpose()?;

    Ok(ValidPaste {
        title: if title.is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            title
        },
        content,
        expires_in,
        max_views,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(content: impl Into<String>) -> CreatePasteRequest {
        CreatePasteRequest {
            content: content.into(),
            ..CreatePasteRequest::default()
        }
    }

    #[test]
    fn empty_content_is_rejected() {
        assert_eq!(validate(request("")), Err("Content cannot be empty"));
    }

    #[test]
    fn content_size_bound_is_inclusive() {
        assert!(validate(request("a".repeat(MAX_CONTENT_BYTES))).is_ok());
        assert_eq!(
            validate(request("a".repeat(MAX_CONTENT_BYTES + 1))),
            Err("Content too large (max 10MB)")
        );
    }

    #[test]
    fn title_defaults_when_missing_or_blank() {
        assert_eq!(validate(request("x")).unwrap().title, DEFAULT_TITLE);

        let blank = CreatePasteRequest {
            title: Some(String::new()),
            ..request("x")
        };
        assert_eq!(validate(blank).unwrap().title, DEFAULT_TITLE);
    }

    #[test]
    fn title_length_counts_characters() {
        let ok = CreatePasteRequest {
            title: Some("é".repeat(MAX_TITLE_CHARS)),
            ..request("x")
        };
        assert!(validate(ok).is_ok());

        let long = CreatePasteRequest {
            title: Some("t".repeat(MAX_TITLE_CHARS + 1)),
            ..request("x")
        };
        assert_eq!(validate(long), Err("Title too long"));
    }

    #[test]
    fn duration_bounds() {
        let with = |hours: i64| CreatePasteRequest {
            expires_in: Some(hours.into()),
            ..request("x")
        };
        assert_eq!(validate(with(0)), Err("Expiration must be positive"));
        assert_eq!(validate(with(-4)), Err("Expiration must be positive"));
        assert_eq!(
            validate(with(8761)),
            Err("Max expiration is 1 year (8760 hours)")
        );
        assert_eq!(validate(with(8760)).unwrap().expires_in, Some(8760));
    }

    #[test]
    fn view_limit_bounds() {
        let with = |views: i64| CreatePasteRequest {
            max_views: Some(views.into()),
            ..request("x")
        };
        assert_eq!(validate(with(0)), Err("Max views must be positive"));
        assert_eq!(
            validate(with(1_000_001)),
            Err("Max views cannot exceed 1,000,000")
        );
        assert_eq!(validate(with(1_000_000)).unwrap().max_views, Some(1_000_000));
    }

    #[test]
    fn fractional_numbers_are_not_integers() {
        let with = |expires_in: f64, max_views: f64| CreatePasteRequest {
            expires_in: Number::from_f64(expires_in),
            max_views: Number::from_f64(max_views),
            ..request("x")
        };
        assert_eq!(validate(with(1.5, 1.0)), Err("Expiration must be an integer"));
        assert_eq!(validate(with(-0.5, 1.0)), Err("Expiration must be an integer"));
        assert_eq!(validate(with(2.0, 2.5)), Err("Max views must be an integer"));

        let whole = validate(with(2.0, 3.0)).unwrap();
        assert_eq!(whole.expires_in, Some(2));
        assert_eq!(whole.max_views, Some(3));

        assert_eq!(
            validate(with(1e20, 1.0)),
            Err("Max expiration is 1 year (8760 hours)")
        );
    }
}
