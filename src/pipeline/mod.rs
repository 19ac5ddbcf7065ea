//! Paginated aggregation pipeline.
//!
//! Every list endpoint describes what it wants as a [`ListSpec`]; a
//! [`QueryPlan`] turns that into a fixed sequence of stages (filter, search
//! scoring, owner join, derived counts, pagination facet) rendered as one
//! page statement plus one count statement over the same predicates. Both
//! run under a single hold of the store connection, so a page and its total
//! always describe the same snapshot.
//!
//! The per-record-kind parts (base relation, projection, which filters and
//! sort keys make sense) are supplied by [`Listing`] implementations in
//! [`listings`].

pub mod listings;
pub mod search;

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use rusqlite::Row;
use rusqlite::types::Value;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::Id;
use crate::store::{SqlBuilder, Store};

pub use listings::{
    ChannelCard, ChannelProfile, CommentCard, PlaylistCard, PlaylistEntry, TweetCard, VideoCard,
    VideoDetail,
};

/// Page size bounds applied when normalizing caller input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_size: u32,
    pub max_size: u32,
}

impl PageLimits {
    pub fn new(default_size: u32, max_size: u32) -> Result<Self> {
        if default_size == 0 || max_size == 0 {
            return Err(Error::invalid("page sizes must be positive"));
        }
        if default_size > max_size {
            return Err(Error::invalid(format!(
                "default page size {default_size} exceeds maximum {max_size}"
            )));
        }
        Ok(Self {
            default_size,
            max_size,
        })
    }
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_size: 10,
            max_size: 100,
        }
    }
}

/// 1-based page number and page size, already normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    /// Clamps explicit values: zero falls back to the defaults, oversized
    /// pages are capped.
    pub fn new(page: u32, size: u32, limits: &PageLimits) -> Self {
        let page = if page == 0 { 1 } else { page };
        let size = match size {
            0 => limits.default_size,
            n => n.min(limits.max_size),
        };
        Self { page, size }
    }

    /// Normalizes raw query-string values. Missing, non-numeric and
    /// non-positive inputs become the defaults.
    pub fn parse(page: Option<&str>, size: Option<&str>, limits: &PageLimits) -> Self {
        Self::new(positive(page), positive(size), limits)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, 0, &PageLimits::default())
    }
}

fn positive(raw: Option<&str>) -> u32 {
    raw.and_then(|text| text.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .map_or(0, |n| u32::try_from(n).unwrap_or(u32::MAX))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    CreatedAt,
    UpdatedAt,
    Title,
    Views,
    Duration,
    Name,
    Position,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::CreatedAt => "createdAt",
            SortKey::UpdatedAt => "updatedAt",
            SortKey::Title => "title",
            SortKey::Views => "views",
            SortKey::Duration => "duration",
            SortKey::Name => "name",
            SortKey::Position => "position",
        }
    }
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "createdAt" | "created_at" => Ok(SortKey::CreatedAt),
            "updatedAt" | "updated_at" => Ok(SortKey::UpdatedAt),
            "title" => Ok(SortKey::Title),
            "views" => Ok(SortKey::Views),
            "duration" => Ok(SortKey::Duration),
            "name" => Ok(SortKey::Name),
            "position" => Ok(SortKey::Position),
            other => Err(Error::invalid(format!("unknown sort key {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" | "1" => Ok(SortDirection::Asc),
            "desc" | "descending" | "-1" => Ok(SortDirection::Desc),
            other => Err(Error::invalid(format!("unknown sort direction {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Sort {
    pub const fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    pub const fn newest() -> Self {
        Self::new(SortKey::CreatedAt, SortDirection::Desc)
    }

    /// `None` when no key was requested; the listing then uses its own
    /// default order. A direction without a key is ignored.
    pub fn parse(key: Option<&str>, direction: Option<&str>) -> Result<Option<Self>> {
        let Some(key) = key.filter(|k| !k.trim().is_empty()) else {
            return Ok(None);
        };
        let key = key.parse()?;
        let direction = match direction.filter(|d| !d.trim().is_empty()) {
            Some(raw) => raw.parse()?,
            None => SortDirection::Desc,
        };
        Ok(Some(Self::new(key, direction)))
    }
}

/// Filterable attributes. Each [`Listing`] decides which it understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Id,
    Owner,
    Username,
    Published,
    Video,
    Tweet,
    ParentComment,
    LikedBy,
    Playlist,
    SubscribersOf,
    SubscriptionsOf,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Id => "id",
            Field::Owner => "owner",
            Field::Username => "username",
            Field::Published => "publication flag",
            Field::Video => "video",
            Field::Tweet => "tweet",
            Field::ParentComment => "parent comment",
            Field::LikedBy => "liker",
            Field::Playlist => "playlist",
            Field::SubscribersOf => "subscribed channel",
            Field::SubscriptionsOf => "subscriber",
        };
        f.write_str(name)
    }
}

/// What one list request asks for.
#[derive(Debug, Clone)]
pub struct ListSpec {
    filters: Vec<(Field, Value)>,
    search: Option<String>,
    sort: Option<Sort>,
    page: PageRequest,
    viewer: Option<Id>,
}

impl ListSpec {
    pub fn new(page: PageRequest) -> Self {
        Self {
            filters: Vec::new(),
            search: None,
            sort: None,
            page,
            viewer: None,
        }
    }

    pub fn filter(mut self, field: Field, value: impl Into<Value>) -> Self {
        self.filters.push((field, value.into()));
        self
    }

    /// Adds the predicate only when a value is present.
    pub fn filter_opt<V: Into<Value>>(self, field: Field, value: Option<V>) -> Self {
        match value {
            Some(value) => self.filter(field, value),
            None => self,
        }
    }

    /// Blank terms disable the search stage.
    pub fn search(mut self, term: Option<&str>) -> Self {
        self.search = term
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_string);
        self
    }

    pub fn sort(mut self, sort: Option<Sort>) -> Self {
        self.sort = sort;
        self
    }

    /// Identity that `isLiked` / `isSubscribed` are computed against.
    pub fn viewer(mut self, viewer: Option<Id>) -> Self {
        self.viewer = viewer;
        self
    }
}

/// Caller-controlled part of a list request, shared by every list
/// operation. Operations add their own filters on top.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub page: PageRequest,
    pub search: Option<String>,
    pub sort: Option<Sort>,
    pub viewer: Option<Id>,
}

impl ListParams {
    pub fn new(page: PageRequest) -> Self {
        Self {
            page,
            ..Self::default()
        }
    }

    pub fn with_viewer(mut self, viewer: Option<Id>) -> Self {
        self.viewer = viewer;
        self
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn spec(&self) -> ListSpec {
        ListSpec::new(self.page)
            .search(self.search.as_deref())
            .sort(self.sort)
            .viewer(self.viewer)
    }
}

/// A record kind that can be listed through the pipeline.
pub trait Listing: Sized {
    /// Plural noun used in error messages.
    const LABEL: &'static str;
    /// Base relation including the owner join, e.g. `videos v JOIN users o ...`.
    const FROM: &'static str;
    const ID: &'static str;
    const CREATED_AT: &'static str;
    /// `(primary, secondary)` text expressions fed to the relevance scorer.
    const SEARCH: Option<(&'static str, &'static str)> = None;
    const DEFAULT_SORT: Sort = Sort::newest();

    /// Predicate template with exactly one `?` for `field`.
    fn predicate(field: Field) -> Option<&'static str>;

    fn sort_column(key: SortKey) -> Option<&'static str>;

    /// Pushes the select list. `viewer` is a text id or `NULL`.
    fn project(qb: &mut SqlBuilder, viewer: &Value);

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// One step of a plan, in execution order.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Filter(Vec<Field>),
    Search(String),
    Join,
    Counts,
    Facet { sort: Sort, page: PageRequest },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub items_on_page: usize,
    pub total_items: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_items: i64) -> Self {
        Self {
            items_on_page: items.len(),
            items,
            total_items,
        }
    }
}

const SCORE_ALIAS: &str = "relevance_score";

/// Rendered statements for one [`ListSpec`] over listing `T`.
#[derive(Debug)]
pub struct QueryPlan<T> {
    stages: Vec<Stage>,
    page: SqlBuilder,
    count: SqlBuilder,
    _listing: PhantomData<fn() -> T>,
}

impl<T: Listing> QueryPlan<T> {
    /// Validates the spec against what `T` supports and renders both
    /// statements. Unsupported filters, search or sort keys are
    /// `InvalidInput`.
    pub fn build(spec: &ListSpec) -> Result<Self> {
        let mut predicates = Vec::with_capacity(spec.filters.len());
        for (field, value) in &spec.filters {
            let template = T::predicate(*field).ok_or_else(|| {
                Error::invalid(format!("{} cannot be filtered by {field}", T::LABEL))
            })?;
            predicates.push((template, value.clone()));
        }

        let scoring = match &spec.search {
            Some(term) => {
                let (primary, secondary) = T::SEARCH.ok_or_else(|| {
                    Error::invalid(format!("{} do not support search", T::LABEL))
                })?;
                Some((
                    format!("{}(?, {primary}, {secondary})", search::FUNCTION),
                    Value::Text(term.clone()),
                ))
            }
            None => None,
        };

        let sort = spec.sort.unwrap_or(T::DEFAULT_SORT);
        let sort_column = T::sort_column(sort.key).ok_or_else(|| {
            Error::invalid(format!(
                "{} cannot be sorted by {}",
                T::LABEL,
                sort.key.as_str()
            ))
        })?;

        let mut stages = vec![Stage::Filter(
            spec.filters.iter().map(|(field, _)| *field).collect(),
        )];
        if let Some(term) = &spec.search {
            stages.push(Stage::Search(term.clone()));
        }
        stages.push(Stage::Join);
        stages.push(Stage::Counts);
        stages.push(Stage::Facet {
            sort,
            page: spec.page,
        });

        let viewer = spec.viewer.map_or(Value::Null, Value::from);
        let mut page = SqlBuilder::new("SELECT ");
        T::project(&mut page, &viewer);
        if let Some((expr, term)) = &scoring {
            page.push(", ")
                .push_template(expr, term.clone())
                .push(" AS ")
                .push(SCORE_ALIAS);
        }
        page.push(" FROM ").push(T::FROM);

        let mut count = SqlBuilder::new(format!("SELECT COUNT(*) FROM {}", T::FROM));

        for qb in [&mut page, &mut count] {
            for (template, value) in &predicates {
                qb.and_where().push_template(template, value.clone());
            }
            if let Some((expr, term)) = &scoring {
                qb.and_where().push_template(expr, term.clone()).push(" > 0");
            }
        }

        page.push(" ORDER BY ");
        if scoring.is_some() {
            page.push(SCORE_ALIAS).push(" DESC, ");
        }
        page.push(sort_column)
            .push(" ")
            .push(sort.direction.sql())
            .push(", ")
            .push(T::CREATED_AT)
            .push(" DESC, ")
            .push(T::ID)
            .push(" DESC LIMIT ")
            .push_bind(i64::from(spec.page.size))
            .push(" OFFSET ")
            .push_bind(spec.page.offset());

        Ok(Self {
            stages,
            page,
            count,
            _listing: PhantomData,
        })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn run(self, store: &Store) -> Result<Page<T>> {
        let (items, total) = store.with_connection(|conn| {
            let items = self.page.query_map(conn, T::from_row)?;
            let total = self.count.query_scalar(conn)?;
            Ok((items, total))
        })?;
        tracing::trace!(
            listing = T::LABEL,
            returned = items.len(),
            total,
            "page resolved"
        );
        Ok(Page::new(items, total))
    }
}

/// Builds and runs the plan for `spec`.
pub fn list_page<T: Listing>(store: &Store, spec: &ListSpec) -> Result<Page<T>> {
    QueryPlan::<T>::build(spec)?.run(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{seed_user, seed_video};

    #[test]
    fn page_request_normalizes_raw_input() {
        let limits = PageLimits::default();
        assert_eq!(
            PageRequest::parse(None, None, &limits),
            PageRequest { page: 1, size: 10 }
        );
        assert_eq!(
            PageRequest::parse(Some("abc"), Some("-3"), &limits),
            PageRequest { page: 1, size: 10 }
        );
        assert_eq!(
            PageRequest::parse(Some("3"), Some("500"), &limits),
            PageRequest { page: 3, size: 100 }
        );
        assert_eq!(PageRequest::parse(Some("3"), Some("20"), &limits).offset(), 40);
    }

    #[test]
    fn page_limits_reject_inverted_bounds() {
        assert!(PageLimits::new(10, 100).is_ok());
        assert_eq!(
            PageLimits::new(50, 20).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
        assert!(PageLimits::new(0, 20).is_err());
    }

    #[test]
    fn sort_parses_known_keys_only() {
        assert_eq!(Sort::parse(None, Some("asc")).unwrap(), None);
        assert_eq!(
            Sort::parse(Some("views"), Some("ASC")).unwrap(),
            Some(Sort::new(SortKey::Views, SortDirection::Asc))
        );
        assert_eq!(
            Sort::parse(Some("createdAt"), None).unwrap(),
            Some(Sort::newest())
        );
        assert!(Sort::parse(Some("likes"), None).is_err());
        assert!(Sort::parse(Some("title"), Some("sideways")).is_err());
    }

    #[test]
    fn plan_stages_follow_fixed_order() {
        let spec = ListSpec::new(PageRequest::default())
            .filter(Field::Published, true)
            .search(Some("  rust "));
        let plan = QueryPlan::<VideoCard>::build(&spec).unwrap();
        assert_eq!(
            plan.stages(),
            &[
                Stage::Filter(vec![Field::Published]),
                Stage::Search("rust".to_string()),
                Stage::Join,
                Stage::Counts,
                Stage::Facet {
                    sort: Sort::newest(),
                    page: PageRequest::default()
                },
            ]
        );
        let sql = plan.page.sql();
        assert!(sql.contains("relevance_score DESC, v.created_at DESC"));
        assert!(sql.ends_with("v.created_at DESC, v.id DESC LIMIT ? OFFSET ?"));
        assert!(plan.count.sql().starts_with("SELECT COUNT(*) FROM videos v"));
        assert!(plan.count.sql().contains("relevance(?"));
    }

    #[test]
    fn blank_search_skips_scoring_stage() {
        let spec = ListSpec::new(PageRequest::default()).search(Some("   "));
        let plan = QueryPlan::<VideoCard>::build(&spec).unwrap();
        assert!(!plan.stages().iter().any(|s| matches!(s, Stage::Search(_))));
        assert!(!plan.page.sql().contains("relevance"));
    }

    #[test]
    fn unsupported_filter_or_sort_is_invalid_input() {
        let spec = ListSpec::new(PageRequest::default()).filter(Field::Playlist, Id::new());
        let err = QueryPlan::<TweetCard>::build(&spec).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let spec = ListSpec::new(PageRequest::default())
            .sort(Some(Sort::new(SortKey::Views, SortDirection::Asc)));
        assert!(QueryPlan::<TweetCard>::build(&spec).is_err());
    }

    #[test]
    fn second_page_holds_the_remainder() {
        let store = Store::open_in_memory().unwrap();
        let alice = seed_user(&store, "alice");
        for n in 0..15 {
            store.insert_tweet(alice.id, &format!("tweet {n}")).unwrap();
        }
        let limits = PageLimits::default();

        let spec = ListSpec::new(PageRequest::new(2, 10, &limits)).filter(Field::Owner, alice.id);
        let page = list_page::<TweetCard>(&store, &spec).unwrap();
        assert_eq!(page.items_on_page, 5);
        assert_eq!(page.total_items, 15);

        let beyond = ListSpec::new(PageRequest::new(4, 10, &limits)).filter(Field::Owner, alice.id);
        let page = list_page::<TweetCard>(&store, &beyond).unwrap();
        assert_eq!(page.items_on_page, 0);
        assert_eq!(page.total_items, 15);
    }

    #[test]
    fn pages_partition_the_result_set() {
        let store = Store::open_in_memory().unwrap();
        let alice = seed_user(&store, "alice");
        for n in 0..23 {
            store.insert_tweet(alice.id, &format!("tweet {n}")).unwrap();
        }
        let limits = PageLimits::default();

        let mut seen = Vec::new();
        let mut on_pages = 0;
        for page_no in 1..=3 {
            let spec = ListSpec::new(PageRequest::new(page_no, 10, &limits));
            let page = list_page::<TweetCard>(&store, &spec).unwrap();
            assert_eq!(page.total_items, 23);
            on_pages += page.items_on_page;
            seen.extend(page.items.into_iter().map(|tweet| tweet.id));
        }
        assert_eq!(on_pages, 23);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 23);
    }

    #[test]
    fn search_ranks_by_relevance_then_requested_sort() {
        let store = Store::open_in_memory().unwrap();
        let alice = seed_user(&store, "alice");
        let weak = seed_video(&store, alice.id, "Cooking basics", "a rust-free kitchen");
        let strong = seed_video(&store, alice.id, "Rust basics", "learn rust");
        seed_video(&store, alice.id, "Gardening", "soil and seeds");

        let spec = ListSpec::new(PageRequest::default())
            .search(Some("rust"))
            .sort(Some(Sort::new(SortKey::Views, SortDirection::Desc)));
        let page = list_page::<VideoCard>(&store, &spec).unwrap();
        assert_eq!(page.total_items, 2);
        let ids: Vec<Id> = page.items.iter().map(|card| card.id).collect();
        assert_eq!(ids, vec![strong.id, weak.id]);
    }
}
