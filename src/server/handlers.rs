use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::ApiError;
use super::gate;
use crate::app::AppData;
use crate::browser::BrowseOptions;
use crate::store::{Error, KvStore};

#[derive(Debug, Deserialize)]
pub(super) struct VisitParams {
    url: Option<String>,
}

/// `GET /api/visit?url=<path>` — count one view and report both totals.
pub(super) async fn record_visit<S: KvStore>(
    State(data): State<AppData<S>>,
    headers: HeaderMap,
    Query(params): Query<VisitParams>,
) -> Result<Json<Value>, ApiError> {
    let origin = gate::caller_origin(&headers);
    if !gate::origin_allowed(&data.allowed_origin, &origin) {
        tracing::warn!("blocked visit from unauthorized origin: {origin}");
        return Err(ApiError::ForbiddenOrigin);
    }

    let path = params
        .url
        .filter(|url| !url.is_empty())
        .ok_or(ApiError::Core(Error::MissingInput("url")))?;

    let totals = data.counter.record_visit(&path).await?;
    Ok(Json(json!({ "total": totals.site, "page": totals.page })))
}

#[derive(Debug, Deserialize)]
pub(super) struct AdminParams {
    action: Option<String>,
    cursor: Option<String>,
    prefix: Option<String>,
    limit: Option<usize>,
    #[serde(default, rename = "onlyKeys")]
    only_keys: bool,
}

/// `GET /api/admin?action=list` — one page of stored keys, with values
/// and decoded paths unless `onlyKeys` asks for the fast path.
pub(super) async fn admin_list<S: KvStore>(
    State(data): State<AppData<S>>,
    headers: HeaderMap,
    Query(params): Query<AdminParams>,
) -> Result<Json<Value>, ApiError> {
    if !gate::authorized(&data.dashboard_token, &headers) {
        tracing::warn!("rejected admin request with bad or missing token");
        return Err(ApiError::Unauthorized);
    }
    if params.action.as_deref() != Some("list") {
        return Err(ApiError::InvalidAction);
    }

    let opts = BrowseOptions {
        limit: params.limit,
        // The dashboard serializes an exhausted cursor as the string
        // "null"; treat it as absent.
        cursor: params.cursor.filter(|c| !c.is_empty() && c != "null"),
        prefix: params.prefix.filter(|p| !p.is_empty()),
    };

    if params.only_keys {
        let page = data.browser.list_keys(&opts).await?;
        return Ok(Json(json!({
            "data": page.keys,
            "cursor": page.cursor,
            "complete": page.complete,
        })));
    }

    let page = data.browser.list_entries(&opts).await?;
    let entries = page
        .entries
        .iter()
        .map(|entry| {
            json!({
                "key": entry.key,
                "value": entry.value,
                "path": entry.path,
            })
        })
        .collect::<Vec<_>>();

    Ok(Json(json!({
        "data": entries,
        "cursor": page.cursor,
        "complete": page.complete,
    })))
}

#[derive(Debug, Deserialize)]
pub(super) struct MutateBody {
    #[serde(default)]
    key: String,
    #[serde(default)]
    value: Option<Value>,
}

/// `POST /api/admin?action=update|delete` — direct write access for the
/// dashboard.
pub(super) async fn admin_mutate<S: KvStore>(
    State(data): State<AppData<S>>,
    headers: HeaderMap,
    Query(params): Query<AdminParams>,
    Json(body): Json<MutateBody>,
) -> Result<Json<Value>, ApiError> {
    if !gate::authorized(&data.dashboard_token, &headers) {
        tracing::warn!("rejected admin request with bad or missing token");
        return Err(ApiError::Unauthorized);
    }

    match params.action.as_deref() {
        Some("update") => {
            let value = body
                .value
                .ok_or(ApiError::Core(Error::MissingInput("value")))?;
            // Whatever JSON type the dashboard posts, the store holds
            // strings.
            let value = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            data.browser.update_entry(&body.key, &value).await?;
        }
        Some("delete") => data.browser.delete_entry(&body.key).await?,
        _ => return Err(ApiError::InvalidAction),
    }

    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::RuntimeData;
    use crate::browser::KeyBrowser;
    use crate::counter::VisitCounter;
    use crate::pagekey::KeyCodec;
    use crate::testkit::MemStore;
    use axum::http::{header, HeaderValue};

    fn app(store: &MemStore, origin: &str, token: Option<&str>) -> AppData<MemStore> {
        let codec = KeyCodec::new();
        RuntimeData::builder()
            .counter(VisitCounter::new(store.clone(), codec))
            .browser(KeyBrowser::new(store.clone(), codec))
            .allowed_origin(origin.to_string())
            .dashboard_token(token.map(str::to_string))
            .build()
            .into()
    }

    fn admin_headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::HeaderName::from_static(gate::AUTH_HEADER),
            HeaderValue::from_str(token).unwrap(),
        );
        headers
    }

    fn list_params(only_keys: bool) -> AdminParams {
        AdminParams {
            action: Some("list".into()),
            cursor: None,
            prefix: None,
            limit: None,
            only_keys,
        }
    }

    #[tokio::test]
    async fn visit_reports_both_totals() {
        let store = MemStore::new();
        let data = app(&store, "*", None);

        let Json(body) = record_visit(
            State(data),
            HeaderMap::new(),
            Query(VisitParams {
                url: Some("/x".into()),
            }),
        )
        .await
        .unwrap();

        assert_eq!(body, json!({ "total": 1, "page": 1 }));
        assert_eq!(store.value_of("site_total_pv"), Some("1".into()));
    }

    #[tokio::test]
    async fn visit_without_url_is_rejected() {
        let data = app(&MemStore::new(), "*", None);

        let err = record_visit(
            State(data.clone()),
            HeaderMap::new(),
            Query(VisitParams { url: None }),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Core(Error::MissingInput("url"))
        ));

        let err = record_visit(
            State(data),
            HeaderMap::new(),
            Query(VisitParams {
                url: Some(String::new()),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Core(Error::MissingInput("url"))));
    }

    #[tokio::test]
    async fn visit_from_foreign_origin_is_blocked() {
        let store = MemStore::new();
        let data = app(&store, "https://blog.example.com", None);

        let mut headers = HeaderMap::new();
        headers.insert(
            header::ORIGIN,
            HeaderValue::from_static("https://evil.example"),
        );

        let err = record_visit(
            State(data),
            headers,
            Query(VisitParams {
                url: Some("/x".into()),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::ForbiddenOrigin));
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn visit_via_matching_referer_is_admitted() {
        let data = app(&MemStore::new(), "https://blog.example.com", None);

        let mut headers = HeaderMap::new();
        headers.insert(
            header::REFERER,
            HeaderValue::from_static("https://blog.example.com/posts/1"),
        );

        record_visit(
            State(data),
            headers,
            Query(VisitParams {
                url: Some("/posts/1".into()),
            }),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn admin_requires_the_token() {
        let data = app(&MemStore::new(), "*", Some("s3cret"));

        let err = admin_list(State(data.clone()), HeaderMap::new(), Query(list_params(false)))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));

        admin_list(
            State(data),
            admin_headers("s3cret"),
            Query(list_params(false)),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn admin_list_returns_entries_with_decoded_paths() {
        let store = MemStore::new();
        store.seed("_posts_B64:5L2g5aW9", "7");
        let data = app(&store, "*", Some("s3cret"));

        let Json(body) = admin_list(
            State(data),
            admin_headers("s3cret"),
            Query(list_params(false)),
        )
        .await
        .unwrap();

        assert_eq!(body["complete"], json!(true));
        assert_eq!(
            body["data"][0],
            json!({
                "key": "_posts_B64:5L2g5aW9",
                "value": "7",
                "path": "/posts/你好",
            })
        );
    }

    #[tokio::test]
    async fn admin_keys_only_list_skips_values() {
        let store = MemStore::new();
        store.seed("_a", "1");
        store.seed("_b", "2");
        let data = app(&store, "*", Some("s3cret"));

        let Json(body) = admin_list(
            State(data),
            admin_headers("s3cret"),
            Query(list_params(true)),
        )
        .await
        .unwrap();

        assert_eq!(body["data"], json!(["_a", "_b"]));
        assert_eq!(store.get_count(), 0);
    }

    #[tokio::test]
    async fn admin_mutations_update_and_delete() {
        let store = MemStore::new();
        store.seed("_x", "1");
        let data = app(&store, "*", Some("s3cret"));

        let mut params = list_params(false);
        params.action = Some("update".into());
        admin_mutate(
            State(data.clone()),
            admin_headers("s3cret"),
            Query(params),
            Json(MutateBody {
                key: "_x".into(),
                value: Some(json!(42)),
            }),
        )
        .await
        .unwrap();
        assert_eq!(store.value_of("_x"), Some("42".into()));

        let mut params = list_params(false);
        params.action = Some("delete".into());
        admin_mutate(
            State(data),
            admin_headers("s3cret"),
            Query(params),
            Json(MutateBody {
                key: "_x".into(),
                value: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(store.value_of("_x"), None);
    }

    #[tokio::test]
    async fn unknown_admin_action_is_rejected() {
        let data = app(&MemStore::new(), "*", Some("s3cret"));

        let mut params = list_params(false);
        params.action = Some("drop".into());
        let err = admin_mutate(
            State(data),
            admin_headers("s3cret"),
            Query(params),
            Json(MutateBody {
                key: "_x".into(),
                value: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidAction));
    }
}
