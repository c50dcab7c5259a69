//! The typed query the dispatcher accepts, and its query-string form.
//!
//! Clients never see upstream URLs.  They send a flat string map such as
//! `type=videos&movieId=550`; the dispatcher parses it back into a
//! [`TypedQuery`] and is the only place that knows the upstream shape.

use std::collections::HashMap;

pub const DEFAULT_SORT_KEY: &str = "popularity.desc";
/// Upstream discovery pages hold 20 results.
pub const DEFAULT_PAGE_LIMIT: usize = 20;

pub const PARAM_TYPE: &str = "type";
pub const PARAM_GENRE: &str = "genre";
pub const PARAM_LIMIT: &str = "limit";
pub const PARAM_SORT: &str = "sort_by";
pub const PARAM_ITEM: &str = "movieId";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryKind {
    Discover,
    Videos,
    Details,
    /// Anything else a caller sent as `type`; rejected by the dispatcher.
    Unknown(String),
}

impl QueryKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "discover" => QueryKind::Discover,
            "videos" => QueryKind::Videos,
            "details" | "movie" => QueryKind::Details,
            other => QueryKind::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            QueryKind::Discover => "discover",
            QueryKind::Videos => "videos",
            QueryKind::Details => "details",
            QueryKind::Unknown(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedQuery {
    pub kind: QueryKind,
    pub genre_id: Option<String>,
    pub item_id: Option<String>,
    pub sort_key: Option<String>,
    pub page_limit: Option<usize>,
}

impl TypedQuery {
    fn of_kind(kind: QueryKind) -> Self {
        Self {
            kind,
            genre_id: None,
            item_id: None,
            sort_key: None,
            page_limit: None,
        }
    }

    pub fn discover(genre_id: Option<&str>, page_limit: usize) -> Self {
        Self {
            genre_id: genre_id.map(str::to_string),
            page_limit: Some(page_limit),
            ..Self::of_kind(QueryKind::Discover)
        }
    }

    pub fn videos(item_id: u64) -> Self {
        Self {
            item_id: Some(item_id.to_string()),
            ..Self::of_kind(QueryKind::Videos)
        }
    }

    pub fn details(item_id: u64) -> Self {
        Self {
            item_id: Some(item_id.to_string()),
            ..Self::of_kind(QueryKind::Details)
        }
    }

    /// Parse a query-string map.  Empty values count as absent, as does a
    /// `limit` that is not a number.  A missing `type` parses as an unknown
    /// kind so the dispatcher can reject it uniformly.
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            params
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            kind: QueryKind::parse(get(PARAM_TYPE).as_deref().unwrap_or_default()),
            genre_id: get(PARAM_GENRE),
            item_id: get(PARAM_ITEM),
            sort_key: get(PARAM_SORT),
            page_limit: get(PARAM_LIMIT).and_then(|l| l.parse().ok()),
        }
    }

    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![(PARAM_TYPE.to_string(), self.kind.as_str().to_string())];
        let optional = [
            (PARAM_GENRE, self.genre_id.clone()),
            (PARAM_ITEM, self.item_id.clone()),
            (PARAM_SORT, self.sort_key.clone()),
            (PARAM_LIMIT, self.page_limit.map(|l| l.to_string())),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                params.push((key.to_string(), value));
            }
        }
        params
    }

    pub fn sort_key(&self) -> &str {
        self.sort_key.as_deref().unwrap_or(DEFAULT_SORT_KEY)
    }

    pub fn page_limit(&self) -> usize {
        self.page_limit.unwrap_or(DEFAULT_PAGE_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_discover_with_defaults() {
        let q = TypedQuery::from_params(&params(&[("type", "discover"), ("genre", "878")]));
        assert_eq!(q.kind, QueryKind::Discover);
        assert_eq!(q.genre_id.as_deref(), Some("878"));
        assert_eq!(q.sort_key(), "popularity.desc");
        assert_eq!(q.page_limit(), 20);
    }

    #[test]
    fn test_movie_is_an_alias_for_details() {
        let q = TypedQuery::from_params(&params(&[("type", "movie"), ("movieId", "550")]));
        assert_eq!(q.kind, QueryKind::Details);
        assert_eq!(q.item_id.as_deref(), Some("550"));
    }

    #[test]
    fn test_empty_and_malformed_values_are_absent() {
        let q = TypedQuery::from_params(&params(&[
            ("type", "videos"),
            ("movieId", "  "),
            ("limit", "lots"),
        ]));
        assert_eq!(q.kind, QueryKind::Videos);
        assert_eq!(q.item_id, None);
        assert_eq!(q.page_limit, None);
    }

    #[test]
    fn test_missing_or_unknown_type() {
        let q = TypedQuery::from_params(&params(&[("movieId", "1")]));
        assert_eq!(q.kind, QueryKind::Unknown(String::new()));
        let q = TypedQuery::from_params(&params(&[("type", "person")]));
        assert_eq!(q.kind, QueryKind::Unknown("person".into()));
    }

    #[test]
    fn test_client_params_parse_back_on_the_server() {
        let sent = TypedQuery::discover(Some("35"), 12);
        let received = TypedQuery::from_params(&sent.to_params().into_iter().collect());
        assert_eq!(received, sent);

        let sent = TypedQuery::videos(603);
        assert_eq!(
            sent.to_params(),
            vec![
                ("type".to_string(), "videos".to_string()),
                ("movieId".to_string(), "603".to_string()),
            ]
        );
    }
}
