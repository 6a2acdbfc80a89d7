//! Postgres-backed [`CatalogReader`].
//!
//! Every source is described by a [`SourceCatalogConfig`] supplied at
//! construction (table, id/text/title columns, optional joins for
//! hydration, keyword-search columns). Queries are built dynamically from
//! that configuration the way the original Python sync worker did, with
//! every identifier passed through [`quote_ident`]/[`quote_qualified`]
//! rather than interpolated raw, since source configuration ultimately
//! comes from a deployment's TOML file rather than end-user input but is
//! still attacker-reachable if that file is ever templated.
//!
//! The underlying `postgres` client is synchronous; every method offloads
//! its query to a blocking thread via [`tokio::task::spawn_blocking`] and
//! borrows a connection from an `r2d2` pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use postgres::types::Type;
use postgres::{NoTls, Row};
use r2d2::Pool;
use r2d2_postgres::PostgresConnectionManager;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

use mcb_domain::error::{Error, Result};
use mcb_domain::ports::providers::catalog::{CatalogReader, ExpansionToken, HydratedRow, PendingRow, TorrentFile};

const SYNC_TABLE_SQL: &str = "
CREATE TABLE IF NOT EXISTS public.sync_state (
    source TEXT NOT NULL,
    pg_id TEXT NOT NULL,
    text_hash TEXT NOT NULL,
    embedding_version TEXT NOT NULL,
    vector_id TEXT,
    nsfw_score REAL NOT NULL DEFAULT 0,
    updated_at TIMESTAMPTZ,
    last_error TEXT,
    PRIMARY KEY (source, pg_id)
)";

const SYNC_INDEX_SQL: &str =
    "CREATE INDEX IF NOT EXISTS sync_state_updated_at_idx ON public.sync_state (updated_at)";

/// Aggregate function applied to a joined field when a `fetch_by_ids`
/// query needs to fold a one-to-many join down to one row per id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggKind {
    /// `array_agg(...)`.
    ArrayAgg,
    /// `json_agg(...)`.
    JsonAgg,
    /// `jsonb_agg(...)`.
    JsonbAgg,
}

impl AggKind {
    fn sql_fn(self) -> &'static str {
        match self {
            AggKind::ArrayAgg => "array_agg",
            AggKind::JsonAgg => "json_agg",
            AggKind::JsonbAgg => "jsonb_agg",
        }
    }
}

/// `LEFT JOIN` vs `INNER JOIN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinType {
    /// `LEFT JOIN`.
    Left,
    /// `INNER JOIN` (also known as `JOIN`).
    Inner,
}

impl JoinType {
    fn sql_kind(self) -> &'static str {
        match self {
            JoinType::Left => "LEFT JOIN",
            JoinType::Inner => "JOIN",
        }
    }
}

/// A single column projected out of a join, optionally folded with an
/// aggregate function.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct JoinField {
    /// Column on the joined table.
    pub column: String,
    /// Output key this column is exposed under in [`HydratedRow::fields`].
    pub alias: String,
    /// Aggregate to apply, when the join is one-to-many.
    #[serde(default)]
    pub agg: Option<AggKind>,
    /// Whether to aggregate with `DISTINCT`.
    #[serde(default)]
    pub distinct: bool,
}

/// A single join used to hydrate `fetch_by_ids` results.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct JoinConfig {
    /// Joined table, `schema.table` or bare `table`.
    pub table: String,
    /// Alias the joined table is referred to by in `on` and in [`JoinField::column`].
    pub alias: String,
    /// Raw `ON` clause, e.g. `"t.id = {alias}.movie_id"`. Operator-authored,
    /// not end-user input; not identifier-quoted.
    pub on: String,
    /// Join kind.
    pub join_type: JoinType,
    /// Columns to project from the joined table.
    #[serde(default)]
    pub fields: Vec<JoinField>,
}

/// Per-source schema description driving every dynamically built query.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SourceCatalogConfig {
    /// Source table, `schema.table` or bare `table`.
    pub table: String,
    /// Primary key column, cast to text for cross-source identity.
    pub id_field: String,
    /// Column concatenated/hashed for sync and embedding.
    pub text_field: String,
    /// Column used as the display title; defaults to `text_field`.
    #[serde(default)]
    pub title_field: Option<String>,
    /// Column driving incremental sync, when the source supports it.
    #[serde(default)]
    pub updated_at_field: Option<String>,
    /// Column `fetch_pending` orders its scan by.
    pub order_field: String,
    /// Additional source columns surfaced in `PendingRow::extra` / `HydratedRow::fields`.
    #[serde(default)]
    pub extra_fields: Vec<String>,
    /// Joins applied when hydrating `fetch_by_ids`.
    #[serde(default)]
    pub joins: Vec<JoinConfig>,
    /// Columns searched by `search_by_keyword`; falls back to `[text_field]`.
    #[serde(default)]
    pub keyword_fields: Vec<String>,
    /// Extra `WHERE` predicate ANDed onto every query against this source.
    /// Operator-authored, not identifier-quoted.
    #[serde(default)]
    pub where_clause: Option<String>,
}

impl SourceCatalogConfig {
    fn title_column(&self) -> &str {
        self.title_field.as_deref().unwrap_or(&self.text_field)
    }
}

/// Validate and double-quote a single SQL identifier.
fn quote_ident(raw: &str) -> Result<String> {
    let valid = !raw.is_empty()
        && raw.chars().enumerate().all(|(i, c)| {
            if i == 0 {
                c.is_ascii_alphabetic() || c == '_'
            } else {
                c.is_ascii_alphanumeric() || c == '_'
            }
        });
    if !valid {
        return Err(Error::invalid_argument(format!("unsafe identifier: {raw:?}")));
    }
    Ok(format!("\"{raw}\""))
}

/// Validate and quote a possibly-qualified identifier (`schema.table`).
fn quote_qualified(raw: &str) -> Result<String> {
    raw.split('.')
        .map(quote_ident)
        .collect::<Result<Vec<_>>>()
        .map(|parts| parts.join("."))
}

fn expansion_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[，,|/·\s]+").expect("static regex"))
}

/// Decode a single result column into a JSON value, dispatching on the
/// column's wire type since `fetch_by_ids`/`fetch_latest_tmdb` project an
/// operator-configured, not statically known, column set.
fn cell_to_json(row: &Row, idx: usize) -> Value {
    match *row.columns()[idx].type_() {
        Type::BOOL => row.get::<_, Option<bool>>(idx).map(Value::from).unwrap_or(Value::Null),
        Type::INT2 => row
            .get::<_, Option<i16>>(idx)
            .map(|v| Value::from(i64::from(v)))
            .unwrap_or(Value::Null),
        Type::INT4 => row
            .get::<_, Option<i32>>(idx)
            .map(|v| Value::from(i64::from(v)))
            .unwrap_or(Value::Null),
        Type::INT8 => row.get::<_, Option<i64>>(idx).map(Value::from).unwrap_or(Value::Null),
        Type::FLOAT4 => row
            .get::<_, Option<f32>>(idx)
            .map(|v| Value::from(f64::from(v)))
            .unwrap_or(Value::Null),
        Type::FLOAT8 => row.get::<_, Option<f64>>(idx).map(Value::from).unwrap_or(Value::Null),
        Type::JSON | Type::JSONB => row.get::<_, Option<Value>>(idx).unwrap_or(Value::Null),
        Type::TIMESTAMPTZ | Type::TIMESTAMP => row
            .get::<_, Option<DateTime<Utc>>>(idx)
            .map(|v| Value::from(v.to_rfc3339()))
            .unwrap_or(Value::Null),
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY => row
            .get::<_, Option<Vec<String>>>(idx)
            .map(Value::from)
            .unwrap_or(Value::Null),
        Type::INT4_ARRAY => row
            .get::<_, Option<Vec<i32>>>(idx)
            .map(|v| Value::from(v.into_iter().map(i64::from).collect::<Vec<_>>()))
            .unwrap_or(Value::Null),
        Type::INT8_ARRAY => row
            .get::<_, Option<Vec<i64>>>(idx)
            .map(Value::from)
            .unwrap_or(Value::Null),
        _ => row.get::<_, Option<String>>(idx).map(Value::from).unwrap_or(Value::Null),
    }
}

/// Postgres-backed relational catalog reader.
pub struct PostgresCatalogReader {
    pool: Pool<PostgresConnectionManager<NoTls>>,
    sources: HashMap<String, SourceCatalogConfig>,
}

impl PostgresCatalogReader {
    /// Connect to `dsn` with a small pool and register per-source schema
    /// configuration. Fails fast if `dsn` does not parse.
    pub fn new(dsn: &str, sources: HashMap<String, SourceCatalogConfig>) -> Result<Self> {
        let config: postgres::Config = dsn
            .parse()
            .map_err(|e| Error::configuration(format!("invalid postgres dsn: {e}")))?;
        let manager = PostgresConnectionManager::new(config, NoTls);
        let pool = Pool::builder()
            .max_size(8)
            .build(manager)
            .map_err(|e| Error::database(format!("building postgres pool: {e}")))?;
        Ok(Self { pool, sources })
    }

    fn source_cfg(&self, source: &str) -> Result<&SourceCatalogConfig> {
        self.sources
            .get(source)
            .ok_or_else(|| Error::not_found(format!("unconfigured catalog source: {source}")))
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut postgres::Client) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| Error::database(format!("pool checkout: {e}")))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| Error::internal(format!("catalog query task panicked: {e}")))?
    }

    fn build_hydration_select(cfg: &SourceCatalogConfig) -> Result<(String, bool, Vec<(String, bool)>)> {
        let id_col = quote_ident(&cfg.id_field)?;
        let title_col = quote_ident(cfg.title_column())?;
        let mut select = vec![
            format!("t.{id_col}::text AS pg_id"),
            format!("t.{title_col} AS title"),
        ];
        // (output key, is_from_join_without_agg) used to build GROUP BY.
        let mut group_cols = vec![(format!("t.{id_col}"), true), (format!("t.{title_col}"), true)];
        for extra in &cfg.extra_fields {
            let col = quote_ident(extra)?;
            select.push(format!("t.{col} AS {col}"));
            group_cols.push((format!("t.{col}"), true));
        }

        let mut has_agg = false;
        let mut joins_sql = Vec::new();
        for join in &cfg.joins {
            let join_table = quote_qualified(&join.table)?;
            let alias = quote_ident(&join.alias)?;
            joins_sql.push(format!("{} {} AS {} ON {}", join.join_type.sql_kind(), join_table, alias, join.on));
            for field in &join.fields {
                let col = quote_ident(&field.column)?;
                let out_alias = quote_ident(&field.alias)?;
                match field.agg {
                    Some(agg) => {
                        has_agg = true;
                        let distinct = if field.distinct { "DISTINCT " } else { "" };
                        select.push(format!("{}({distinct}{alias}.{col}) AS {out_alias}", agg.sql_fn()));
                    }
                    None => {
                        select.push(format!("{alias}.{col} AS {out_alias}"));
                        group_cols.push((format!("{alias}.{col}"), false));
                    }
                }
            }
        }

        let table = quote_qualified(&cfg.table)?;
        let mut sql = format!("SELECT {} FROM {} t", select.join(", "), table);
        for join_sql in &joins_sql {
            sql.push(' ');
            sql.push_str(join_sql);
        }
        Ok((sql, has_agg, group_cols))
    }
}

#[async_trait]
impl CatalogReader for PostgresCatalogReader {
    async fn ensure_tables(&self, _source: &str) -> Result<()> {
        self.with_conn(move |client| {
            client
                .batch_execute(SYNC_TABLE_SQL)
                .map_err(|e| Error::database(format!("creating sync_state: {e}")))?;
            client
                .batch_execute(SYNC_INDEX_SQL)
                .map_err(|e| Error::database(format!("creating sync_state index: {e}")))?;
            Ok(())
        })
        .await
    }

    async fn fetch_pending(&self, source: &str, batch_size: usize) -> Result<Vec<PendingRow>> {
        let cfg = self.source_cfg(source)?.clone();
        let source = source.to_string();
        self.with_conn(move |client| {
            let table = quote_qualified(&cfg.table)?;
            let id_col = quote_ident(&cfg.id_field)?;
            let text_col = quote_ident(&cfg.text_field)?;
            let order_col = quote_ident(&cfg.order_field)?;
            let extra_cols = cfg
                .extra_fields
                .iter()
                .map(|f| quote_ident(f))
                .collect::<Result<Vec<_>>>()?;

            let updated_at_select = match &cfg.updated_at_field {
                Some(f) => format!("t.{} AS updated_at", quote_ident(f)?),
                None => "NULL::timestamptz AS updated_at".to_string(),
            };

            let staleness_cond = match &cfg.updated_at_field {
                Some(f) => {
                    let col = quote_ident(f)?;
                    format!("s.pg_id IS NULL OR t.{col} > COALESCE(s.updated_at, to_timestamp(0))")
                }
                None => format!("s.pg_id IS NULL OR s.text_hash IS DISTINCT FROM md5(t.{text_col}::text)"),
            };

            let mut sql = format!(
                "SELECT t.{id_col}::text AS pg_id, t.{text_col} AS text, md5(t.{text_col}::text) AS text_hash, \
                 {updated_at_select}{extra_select} \
                 FROM {table} t \
                 LEFT JOIN public.sync_state s ON s.source = $1 AND s.pg_id = t.{id_col}::text \
                 WHERE ({staleness_cond})",
                extra_select = extra_cols.iter().map(|c| format!(", t.{c} AS {c}")).collect::<String>(),
            );
            if let Some(extra_where) = &cfg.where_clause {
                sql.push_str(&format!(" AND ({extra_where})"));
            }
            sql.push_str(&format!(" ORDER BY t.{order_col} NULLS LAST LIMIT $2"));

            let rows = client
                .query(&sql, &[&source, &(batch_size as i64)])
                .map_err(|e| Error::database(format!("fetch_pending({source}): {e}")))?;

            Ok(rows
                .iter()
                .map(|row| {
                    let mut extra = HashMap::new();
                    for (i, field) in cfg.extra_fields.iter().enumerate() {
                        extra.insert(field.clone(), cell_to_json(row, 4 + i));
                    }
                    PendingRow {
                        pg_id: row.get("pg_id"),
                        text: row.get("text"),
                        text_hash: row.get("text_hash"),
                        updated_at: row.get("updated_at"),
                        extra,
                    }
                })
                .collect())
        })
        .await
    }

    async fn upsert_sync_state(&self, source: &str, rows: &[(String, String, String, f32)]) -> Result<()> {
        let source = source.to_string();
        let rows = rows.to_vec();
        self.with_conn(move |client| {
            let mut txn = client
                .transaction()
                .map_err(|e| Error::database(format!("begin upsert_sync_state txn: {e}")))?;
            let stmt = txn
                .prepare(
                    "INSERT INTO public.sync_state (source, pg_id, text_hash, embedding_version, nsfw_score, updated_at, last_error) \
                     VALUES ($1, $2, $3, $4, $5, now(), NULL) \
                     ON CONFLICT (source, pg_id) DO UPDATE SET \
                        text_hash = EXCLUDED.text_hash, \
                        embedding_version = EXCLUDED.embedding_version, \
                        nsfw_score = EXCLUDED.nsfw_score, \
                        updated_at = now(), \
                        last_error = NULL",
                )
                .map_err(|e| Error::database(format!("prepare upsert_sync_state: {e}")))?;
            for (pg_id, text_hash, embedding_version, nsfw_score) in &rows {
                txn.execute(&stmt, &[&source, pg_id, text_hash, embedding_version, &(*nsfw_score as f32)])
                    .map_err(|e| Error::database(format!("upsert_sync_state({source}, {pg_id}): {e}")))?;
            }
            txn.commit()
                .map_err(|e| Error::database(format!("commit upsert_sync_state txn: {e}")))
        })
        .await
    }

    async fn mark_failure(&self, source: &str, pg_ids: &[String], error: &str) -> Result<()> {
        let source = source.to_string();
        let pg_ids = pg_ids.to_vec();
        let truncated: String = error.chars().take(512).collect();
        self.with_conn(move |client| {
            let mut txn = client
                .transaction()
                .map_err(|e| Error::database(format!("begin mark_failure txn: {e}")))?;
            let stmt = txn
                .prepare(
                    "INSERT INTO public.sync_state (source, pg_id, text_hash, embedding_version, nsfw_score, last_error) \
                     VALUES ($1, $2, '', '', 0, $3) \
                     ON CONFLICT (source, pg_id) DO UPDATE SET last_error = EXCLUDED.last_error",
                )
                .map_err(|e| Error::database(format!("prepare mark_failure: {e}")))?;
            for pg_id in &pg_ids {
                txn.execute(&stmt, &[&source, pg_id, &truncated])
                    .map_err(|e| Error::database(format!("mark_failure({source}, {pg_id}): {e}")))?;
            }
            txn.commit()
                .map_err(|e| Error::database(format!("commit mark_failure txn: {e}")))
        })
        .await
    }

    async fn fetch_by_ids(&self, source: &str, pg_ids: &[String]) -> Result<Vec<HydratedRow>> {
        if pg_ids.is_empty() {
            return Ok(Vec::new());
        }
        let cfg = self.source_cfg(source)?.clone();
        let pg_ids = pg_ids.to_vec();
        let source = source.to_string();
        self.with_conn(move |client| {
            let id_col = quote_ident(&cfg.id_field)?;
            let (mut sql, has_agg, group_cols) = Self::build_hydration_select(&cfg)?;
            sql.push_str(&format!(" WHERE t.{id_col}::text = ANY($1)"));
            if let Some(extra_where) = &cfg.where_clause {
                sql.push_str(&format!(" AND ({extra_where})"));
            }
            if has_agg {
                let group_by = group_cols.into_iter().map(|(c, _)| c).collect::<Vec<_>>().join(", ");
                sql.push_str(&format!(" GROUP BY {group_by}"));
            }

            let rows = client
                .query(&sql, &[&pg_ids])
                .map_err(|e| Error::database(format!("fetch_by_ids({source}): {e}")))?;

            Ok(rows
                .iter()
                .map(|row| {
                    let mut fields = HashMap::new();
                    for (i, col) in row.columns().iter().enumerate().skip(2) {
                        fields.insert(col.name().to_string(), cell_to_json(row, i));
                    }
                    HydratedRow { pg_id: row.get("pg_id"), title: row.get("title"), fields }
                })
                .collect())
        })
        .await
    }

    async fn search_by_keyword(&self, source: &str, query: &str, limit: usize) -> Result<Vec<HydratedRow>> {
        let cfg = self.source_cfg(source)?.clone();
        let query = query.to_string();
        let source = source.to_string();
        self.with_conn(move |client| {
            let table = quote_qualified(&cfg.table)?;
            let id_col = quote_ident(&cfg.id_field)?;
            let title_col = quote_ident(cfg.title_column())?;
            let text_col = quote_ident(&cfg.text_field)?;
            let keyword_cols = if cfg.keyword_fields.is_empty() {
                vec![cfg.text_field.clone()]
            } else {
                cfg.keyword_fields.clone()
            };
            let ilike_clauses = keyword_cols
                .iter()
                .map(|f| quote_ident(f).map(|c| format!("t.{c} ILIKE $1")))
                .collect::<Result<Vec<_>>>()?
                .join(" OR ");

            let mut sql = format!(
                "SELECT DISTINCT ON (t.{text_col}) t.{id_col}::text AS pg_id, t.{title_col} AS title \
                 FROM {table} t WHERE ({ilike_clauses})",
            );
            if let Some(extra_where) = &cfg.where_clause {
                sql.push_str(&format!(" AND ({extra_where})"));
            }
            sql.push_str(&format!(" ORDER BY t.{text_col} LIMIT $2"));

            let pattern = format!("%{query}%");
            let rows = client
                .query(&sql, &[&pattern, &(limit as i64)])
                .map_err(|e| Error::database(format!("search_by_keyword({source}): {e}")))?;

            Ok(rows
                .iter()
                .map(|row| HydratedRow {
                    pg_id: row.get("pg_id"),
                    title: row.get("title"),
                    fields: HashMap::new(),
                })
                .collect())
        })
        .await
    }

    async fn fetch_torrent_files(&self, schema: &str, info_hash: &str, limit: usize) -> Result<Vec<TorrentFile>> {
        let schema = schema.to_string();
        let info_hash = info_hash.to_string();
        self.with_conn(move |client| {
            let table = quote_qualified(&format!("{schema}.torrent_files_view"))?;
            let sql = format!(
                "SELECT index, path, extension, size, updated_at FROM {table} \
                 WHERE info_hash::text = $1 ORDER BY index LIMIT $2",
            );
            let rows = client
                .query(&sql, &[&info_hash, &(limit as i64)])
                .map_err(|e| Error::database(format!("fetch_torrent_files({schema}): {e}")))?;
            Ok(rows
                .iter()
                .map(|row| TorrentFile {
                    index: row.get("index"),
                    path: row.get("path"),
                    extension: row.get::<_, String>("extension").to_lowercase(),
                    size: row.get("size"),
                    updated_at: row.get("updated_at"),
                })
                .collect())
        })
        .await
    }

    async fn search_tmdb_expansions(&self, schema: &str, query: &str, limit: usize) -> Result<Vec<ExpansionToken>> {
        let schema = schema.to_string();
        let query = query.to_string();
        let rows: Vec<(Option<String>, Option<String>)> = self
            .with_conn(move |client| {
                let table = quote_qualified(&format!("{schema}.tmdb_enrichment"))?;
                let sql = format!(
                    "SELECT aka, keywords FROM {table} WHERE aka ILIKE $1 OR keywords ILIKE $1 LIMIT 200",
                );
                let pattern = format!("%{query}%");
                let rows = client
                    .query(&sql, &[&pattern])
                    .map_err(|e| Error::database(format!("search_tmdb_expansions({schema}): {e}")))?;
                Ok(rows
                    .iter()
                    .map(|row| (row.get::<_, Option<String>>("aka"), row.get::<_, Option<String>>("keywords")))
                    .collect())
            })
            .await?;

        let splitter = expansion_token_regex();
        let mut weights: HashMap<String, u8> = HashMap::new();
        for (aka, keywords) in rows {
            for token in aka.iter().flat_map(|s| splitter.split(s)) {
                let token = token.trim();
                if token.is_empty() {
                    continue;
                }
                weights.entry(token.to_string()).and_modify(|w| *w = (*w).max(2)).or_insert(2);
            }
            for token in keywords.iter().flat_map(|s| splitter.split(s)) {
                let token = token.trim();
                if token.is_empty() {
                    continue;
                }
                weights.entry(token.to_string()).and_modify(|w| *w = (*w).max(1)).or_insert(1);
            }
        }

        let mut tokens: Vec<ExpansionToken> = weights
            .into_iter()
            .map(|(token, weight)| ExpansionToken { token, weight })
            .collect();
        tokens.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.token.cmp(&b.token)));
        tokens.truncate(limit);
        Ok(tokens)
    }

    async fn fetch_latest_tmdb(&self, schema: &str, limit: usize) -> Result<Vec<HydratedRow>> {
        let schema = schema.to_string();
        self.with_conn(move |client| {
            let enrichment = quote_qualified(&format!("{schema}.tmdb_enrichment"))?;
            let sql = format!(
                "SELECT c.id::text AS pg_id, c.title AS title, e.* \
                 FROM public.content c JOIN {enrichment} e ON e.type = c.type AND e.id = c.id \
                 WHERE e.source = 'tmdb' ORDER BY e.updated_at DESC NULLS LAST LIMIT $1",
            );
            let rows = client
                .query(&sql, &[&(limit as i64)])
                .map_err(|e| Error::database(format!("fetch_latest_tmdb({schema}): {e}")))?;
            Ok(rows
                .iter()
                .map(|row| {
                    let mut fields = HashMap::new();
                    for (i, col) in row.columns().iter().enumerate().skip(2) {
                        let name = col.name();
                        if name == "type" || name == "id" {
                            continue;
                        }
                        fields.insert(name.to_string(), cell_to_json(row, i));
                    }
                    HydratedRow { pg_id: row.get("pg_id"), title: row.get("title"), fields }
                })
                .collect())
        })
        .await
    }

    async fn fetch_tmdb_detail(&self, schema: &str, tmdb_id: i64, content_type: &str) -> Result<Option<HydratedRow>> {
        let schema = schema.to_string();
        let content_type = content_type.to_string();
        self.with_conn(move |client| {
            let enrichment = quote_qualified(&format!("{schema}.tmdb_enrichment"))?;
            let primary_sql = format!(
                "SELECT id::text AS pg_id, title, * FROM {enrichment} \
                 WHERE type = $1 AND id = $2 ORDER BY updated_at DESC NULLS LAST LIMIT 1",
            );
            let row = client
                .query_opt(&primary_sql, &[&content_type, &tmdb_id])
                .map_err(|e| Error::database(format!("fetch_tmdb_detail({schema}): {e}")))?;

            let row = match row {
                Some(row) => Some(row),
                None => {
                    let fallback_sql = format!(
                        "SELECT id::text AS pg_id, title, * FROM {enrichment} \
                         WHERE id = $1 ORDER BY updated_at DESC NULLS LAST LIMIT 1",
                    );
                    client
                        .query_opt(&fallback_sql, &[&tmdb_id])
                        .map_err(|e| Error::database(format!("fetch_tmdb_detail({schema}) fallback: {e}")))?
                }
            };

            Ok(row.map(|row| {
                let mut fields = HashMap::new();
                for (i, col) in row.columns().iter().enumerate().skip(2) {
                    let name = col.name();
                    if name == "type" || name == "id" {
                        continue;
                    }
                    fields.insert(name.to_string(), cell_to_json(&row, i));
                }
                HydratedRow { pg_id: row.get("pg_id"), title: row.get("title"), fields }
            }))
        })
        .await
    }

    async fn sync_counts(&self, source: &str) -> Result<(u64, u64, Option<DateTime<Utc>>)> {
        let source = source.to_string();
        self.with_conn(move |client| {
            let row = client
                .query_one(
                    "SELECT count(*) FILTER (WHERE last_error IS NULL) AS synced, \
                            count(*) FILTER (WHERE last_error IS NOT NULL) AS failed, \
                            max(updated_at) AS last_synced_at \
                     FROM public.sync_state WHERE source = $1",
                    &[&source],
                )
                .map_err(|e| Error::database(format!("sync_counts({source}): {e}")))?;
            let synced: i64 = row.get("synced");
            let failed: i64 = row.get("failed");
            let last_synced_at: Option<DateTime<Utc>> = row.get("last_synced_at");
            Ok((synced.max(0) as u64, failed.max(0) as u64, last_synced_at))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_ident_rejects_unsafe_names() {
        assert!(quote_ident("movies").is_ok());
        assert!(quote_ident("_private").is_ok());
        assert!(quote_ident("1leading_digit").is_err());
        assert!(quote_ident("movies; DROP TABLE x").is_err());
        assert!(quote_ident("").is_err());
    }

    #[test]
    fn quote_qualified_splits_schema() {
        assert_eq!(quote_qualified("public.movies").unwrap(), "\"public\".\"movies\"");
        assert!(quote_qualified("public.movies; --").is_err());
    }

    #[test]
    fn expansion_tokens_weight_aka_above_keywords_and_dedupe() {
        let splitter = expansion_token_regex();
        let aka_tokens: Vec<&str> = splitter.split("Alpha, Beta|Gamma").collect();
        assert_eq!(aka_tokens, vec!["Alpha", "Beta", "Gamma"]);

        let mut weights: HashMap<String, u8> = HashMap::new();
        for t in ["Alpha", "Beta"] {
            weights.entry(t.to_string()).and_modify(|w| *w = (*w).max(2)).or_insert(2);
        }
        for t in ["Alpha", "Gamma"] {
            weights.entry(t.to_string()).and_modify(|w| *w = (*w).max(1)).or_insert(1);
        }
        assert_eq!(weights["Alpha"], 2);
        assert_eq!(weights["Beta"], 2);
        assert_eq!(weights["Gamma"], 1);
    }
}
