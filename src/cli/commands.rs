use std::fmt::Write as _;
use std::io::{self, Read};

use anyhow::{anyhow, Result};
use clap::Args;
use strum::IntoEnumIterator;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::catalog::ReportCatalog;
use crate::config::{AppConfig, DisplayOptions};
use crate::error::CatalogError;
use crate::labels::{Category, LabelResolver, Location};
use crate::lifecycle::ClaimantRole;
use crate::model::{ItemReport, ReportDraft, ReportId, ReportKind};
use crate::recency::RecencyFormatter;
use crate::search::{parse_query, CategoryFilter, FilterEngine, Tab, TabCounts};
use crate::storage::ReportStore;

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Search words (supports category: and tab: prefixes)
    #[arg()]
    pub query: Vec<String>,
    /// Only show one tab: all, lost or found
    #[arg(long)]
    pub tab: Option<Tab>,
    /// Only show one category code (e.g. electronics)
    #[arg(long)]
    pub category: Option<String>,
    /// Limit the number of results printed (defaults to search.max_results)
    #[arg(long)]
    pub limit: Option<usize>,
    /// Print matching reports as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Report identifier
    pub id: String,
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Whether the item was lost or found
    pub kind: ReportKind,
    /// Short item name
    pub name: String,
    /// Category code (electronics, accessories, documents, ...)
    #[arg(long)]
    pub category: String,
    /// Location code (biblioteca, comedor, canchas, ...)
    #[arg(long)]
    pub location: String,
    /// Item description. If omitted, reads from stdin.
    #[arg(long)]
    pub description: Option<String>,
    /// Reward offered for a lost item
    #[arg(long)]
    pub reward: Option<f64>,
    /// Alternate contact (phone, e-mail)
    #[arg(long)]
    pub contact: Option<String>,
    /// Reference to an uploaded photo
    #[arg(long)]
    pub image: Option<String>,
    /// Day the item was lost or found (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub date: Option<Date>,
}

#[derive(Args, Debug, Clone)]
pub struct ClaimArgs {
    /// Report identifier
    pub id: String,
    /// Who is claiming; inferred from the report type when omitted
    #[arg(long)]
    pub role: Option<ClaimantRole>,
}

#[derive(Args, Debug, Clone)]
pub struct ConfirmArgs {
    /// Report identifier
    pub id: String,
}

pub async fn run_list<S: ReportStore>(
    catalog: &ReportCatalog<S>,
    config: &AppConfig,
    args: &ListArgs,
    now: OffsetDateTime,
) -> Result<String> {
    let listing = catalog.list_active().await;

    let mut query = parse_query(&args.query.join(" "));
    if let Some(tab) = args.tab {
        query.tab = tab;
    }
    if let Some(category) = &args.category {
        query.category = CategoryFilter::parse(category);
    }

    let engine = FilterEngine::default();
    let limit = args.limit.unwrap_or(config.search.max_results);
    let matches: Vec<&ItemReport> = engine
        .apply(&listing.reports, &query)
        .into_iter()
        .take(limit)
        .collect();

    if args.json {
        let mut out = serde_json::to_string_pretty(&matches)?;
        out.push('\n');
        return Ok(out);
    }

    let mut out = String::new();
    if let Some(err) = listing.error() {
        let _ = writeln!(&mut out, "warning: {err}");
    }
    let counts = engine.tab_counts(&listing.reports, &query);
    out.push_str(&format_listing(
        &matches,
        counts,
        &config.display,
        &config.recency_formatter(),
        now,
    ));
    Ok(out)
}

pub async fn run_show<S: ReportStore>(
    catalog: &ReportCatalog<S>,
    config: &AppConfig,
    args: &ShowArgs,
    now: OffsetDateTime,
) -> Result<String> {
    let id = ReportId::from(args.id.trim());
    let report = catalog.find(&id).await.map_err(explain)?;
    if args.json {
        let mut out = serde_json::to_string_pretty(&report)?;
        out.push('\n');
        return Ok(out);
    }
    Ok(format_detail(
        &report,
        &config.display,
        &config.recency_formatter(),
        now,
    ))
}

pub async fn run_report<S: ReportStore>(
    catalog: &ReportCatalog<S>,
    args: ReportArgs,
) -> Result<String> {
    let description = match args.description {
        Some(text) => Some(text),
        None => read_stdin()?,
    };

    let mut draft = ReportDraft::new(args.kind, args.name, args.category, args.location);
    draft.description = description;
    draft.reward_amount = args.reward;
    draft.contact = args.contact;
    draft.image_ref = args.image;
    draft.occurred_on = args.date;

    let report = catalog.create(draft).await.map_err(explain)?;
    Ok(format!("Created {} report {}\n", report.kind, report.id))
}

pub async fn run_claim<S: ReportStore>(
    catalog: &ReportCatalog<S>,
    args: &ClaimArgs,
) -> Result<String> {
    let id = ReportId::from(args.id.trim());
    let report = catalog.find(&id).await.map_err(explain)?;
    let role = args
        .role
        .unwrap_or_else(|| ClaimantRole::counterpart_of(report.kind));
    let claimed = catalog.claim(&report, role).await.map_err(explain)?;
    Ok(format!(
        "Report {} is now {}.\n",
        claimed.id,
        LabelResolver.status(claimed.status)
    ))
}

pub async fn run_confirm<S: ReportStore>(
    catalog: &ReportCatalog<S>,
    args: &ConfirmArgs,
) -> Result<String> {
    let id = ReportId::from(args.id.trim());
    let report = catalog.find(&id).await.map_err(explain)?;
    let returned = catalog.confirm_return(&report).await.map_err(explain)?;
    Ok(format!(
        "Report {} is now {}.\n",
        returned.id,
        LabelResolver.status(returned.status)
    ))
}

fn explain(err: CatalogError) -> anyhow::Error {
    match err {
        CatalogError::Conflict { id, actual } => {
            anyhow!("report {id} was already claimed by someone else (now {actual})")
        }
        CatalogError::NotFound(id) => anyhow!("no report with id {id}"),
        CatalogError::ValidationFailed { field: "category" } => anyhow!(
            "unknown or missing category; expected one of: {}",
            join_codes(Category::iter().map(|code| code.to_string()))
        ),
        CatalogError::ValidationFailed { field: "location" } => anyhow!(
            "unknown or missing location; expected one of: {}",
            join_codes(Location::iter().map(|code| code.to_string()))
        ),
        other => other.into(),
    }
}

fn join_codes(codes: impl Iterator<Item = String>) -> String {
    codes.collect::<Vec<_>>().join(", ")
}

fn format_listing(
    reports: &[&ItemReport],
    counts: TabCounts,
    display: &DisplayOptions,
    recency: &RecencyFormatter,
    now: OffsetDateTime,
) -> String {
    let labels = LabelResolver;
    let mut out = String::new();
    let _ = writeln!(
        &mut out,
        "all {} | lost {} | found {}",
        counts.all, counts.lost, counts.found
    );
    if reports.is_empty() {
        out.push_str("No reports match.\n");
        return out;
    }
    for report in reports {
        let _ = writeln!(
            &mut out,
            "{}  [{}] {}",
            report.id,
            labels.kind(report.kind),
            report.name
        );
        let _ = writeln!(
            &mut out,
            "    {} | {} | {}",
            labels.category(&report.category),
            labels.location(&report.location),
            recency.format(report.created_at, now)
        );
        if let Some(amount) = shown_reward(report, display) {
            let _ = writeln!(&mut out, "    Reward: ${amount:.2}");
        }
    }
    out
}

fn format_detail(
    report: &ItemReport,
    display: &DisplayOptions,
    recency: &RecencyFormatter,
    now: OffsetDateTime,
) -> String {
    let labels = LabelResolver;
    let mut out = String::new();
    let _ = writeln!(&mut out, "{}", report.name);
    let _ = writeln!(&mut out, "  id        {}", report.id);
    let _ = writeln!(&mut out, "  type      {}", labels.kind(report.kind));
    let _ = writeln!(&mut out, "  status    {}", labels.status(report.status));
    let _ = writeln!(&mut out, "  category  {}", labels.category(&report.category));
    let _ = writeln!(&mut out, "  location  {}", labels.location(&report.location));
    let _ = writeln!(
        &mut out,
        "  reported  {}",
        recency.format(report.created_at, now)
    );
    if let Some(date) = report.occurred_on {
        let _ = writeln!(&mut out, "  date      {date}");
    }
    if let Some(amount) = shown_reward(report, display) {
        let _ = writeln!(&mut out, "  reward    ${amount:.2}");
    }
    if let Some(contact) = &report.contact {
        let _ = writeln!(&mut out, "  contact   {contact}");
    }
    if let Some(description) = &report.description {
        let _ = writeln!(&mut out, "\n{description}");
    }
    out
}

fn shown_reward(report: &ItemReport, display: &DisplayOptions) -> Option<f64> {
    if display.show_rewards {
        report.advertised_reward()
    } else {
        None
    }
}

fn parse_date(raw: &str) -> Result<Date, String> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|err| format!("expected YYYY-MM-DD: {err}"))
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(Some(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigPaths, StorageOptions};
    use crate::model::ReportStatus;
    use crate::storage::{self, MemoryStore, SqliteStore};
    use tempfile::TempDir;
    use time::macros::datetime;
    use time::Duration;

    type TestResult<T = ()> = Result<T>;

    const NOW: OffsetDateTime = datetime!(2025-11-20 12:00 UTC);

    fn report(
        id: &str,
        kind: ReportKind,
        name: &str,
        category: &str,
        location: &str,
        age: Duration,
    ) -> ItemReport {
        ItemReport {
            id: ReportId::from(id),
            name: name.to_string(),
            description: Some(format!("{name} description")),
            category: category.to_string(),
            location: location.to_string(),
            kind,
            status: ReportStatus::Active,
            reward_amount: None,
            image_ref: None,
            contact: None,
            occurred_on: None,
            created_at: NOW - age,
        }
    }

    fn memory_catalog() -> ReportCatalog<MemoryStore> {
        let mut laptop = report(
            "a1",
            ReportKind::Lost,
            "Laptop Dell",
            "electronics",
            "biblioteca",
            Duration::hours(2),
        );
        laptop.reward_amount = Some(50.0);
        ReportCatalog::new(MemoryStore::with_reports([
            laptop,
            report(
                "b2",
                ReportKind::Found,
                "Mochila Nike",
                "accessories",
                "canchas",
                Duration::days(3),
            ),
            report(
                "c3",
                ReportKind::Found,
                "Cartera",
                "documents",
                "admin",
                Duration::days(10),
            ),
        ]))
    }

    fn setup_storage() -> TestResult<(TempDir, SqliteStore)> {
        let temp = TempDir::new()?;
        let base = temp.path();
        let paths = ConfigPaths::rooted(
            base.join("config"),
            base.join("config").join("config.toml"),
            base.join("data"),
        );
        paths.ensure_directories()?;
        let mut options = StorageOptions::default();
        options.database_path = paths.database_path.clone();
        options.seed_demo_reports = false;
        let store = storage::init(&paths, &options)?;
        Ok((temp, store))
    }

    fn report_args(kind: ReportKind, name: &str) -> ReportArgs {
        ReportArgs {
            kind,
            name: name.into(),
            category: "electronics".into(),
            location: "lab".into(),
            description: Some("Negro, con cargador".into()),
            reward: None,
            contact: None,
            image: None,
            date: None,
        }
    }

    fn created_id(output: &str) -> String {
        output
            .trim()
            .rsplit(' ')
            .next()
            .unwrap_or_default()
            .to_string()
    }

    #[tokio::test]
    async fn cli_list_renders_labels_recency_and_rewards() -> TestResult {
        let catalog = memory_catalog();
        let output = run_list(&catalog, &AppConfig::default(), &ListArgs::default(), NOW).await?;
        insta::assert_snapshot!(output, @r###"
all 3 | lost 1 | found 2
a1  [Perdido] Laptop Dell
    Electrónicos | Biblioteca Central | 2 hours ago
    Reward: $50.00
b2  [Encontrado] Mochila Nike
    Accesorios | Canchas Deportivas | 3 days ago
c3  [Encontrado] Cartera
    Documentos/Llaves | Edificio Administrativo | 10/11/2025
"###);
        Ok(())
    }

    #[tokio::test]
    async fn cli_list_applies_tab_and_search_words() -> TestResult {
        let catalog = memory_catalog();
        let args = ListArgs {
            query: vec!["tab:found".into(), "canchas".into()],
            ..ListArgs::default()
        };
        let output = run_list(&catalog, &AppConfig::default(), &args, NOW).await?;
        assert!(output.starts_with("all 1 | lost 0 | found 1\n"));
        assert!(output.contains("Mochila Nike"));
        assert!(!output.contains("Cartera"));
        assert!(!output.contains("Laptop Dell"));
        Ok(())
    }

    #[tokio::test]
    async fn cli_list_hides_rewards_when_disabled() -> TestResult {
        let catalog = memory_catalog();
        let mut config = AppConfig::default();
        config.display.show_rewards = false;
        let output = run_list(&catalog, &config, &ListArgs::default(), NOW).await?;
        assert!(!output.contains("Reward"));
        Ok(())
    }

    #[tokio::test]
    async fn cli_list_json_respects_limit() -> TestResult {
        let catalog = memory_catalog();
        let args = ListArgs {
            limit: Some(2),
            json: true,
            ..ListArgs::default()
        };
        let output = run_list(&catalog, &AppConfig::default(), &args, NOW).await?;
        let value: serde_json::Value = serde_json::from_str(&output)?;
        let items = value.as_array().cloned().unwrap_or_default();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["id"], "a1");
        assert_eq!(items[0]["type"], "lost");
        Ok(())
    }

    #[tokio::test]
    async fn cli_list_reports_refresh_failure() -> TestResult {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let catalog = ReportCatalog::new(store);
        let output = run_list(&catalog, &AppConfig::default(), &ListArgs::default(), NOW).await?;
        assert!(output.starts_with("warning: could not refresh reports"));
        assert!(output.contains("No reports match."));
        Ok(())
    }

    #[tokio::test]
    async fn cli_report_claim_and_confirm_walk_the_lifecycle() -> TestResult {
        let (_temp, store) = setup_storage()?;
        let catalog = ReportCatalog::new(store);

        let created = run_report(&catalog, report_args(ReportKind::Lost, "Cargador USB-C")).await?;
        assert!(created.starts_with("Created lost report "));
        let id = created_id(&created);

        let claimed = run_claim(
            &catalog,
            &ClaimArgs {
                id: id.clone(),
                role: None,
            },
        )
        .await?;
        assert_eq!(claimed, format!("Report {id} is now Coincidencia.\n"));

        let again = run_claim(
            &catalog,
            &ClaimArgs {
                id: id.clone(),
                role: None,
            },
        )
        .await;
        let message = again.expect_err("second claim must fail").to_string();
        assert!(message.contains("matched"), "{message}");

        let confirmed = run_confirm(&catalog, &ConfirmArgs { id: id.clone() }).await?;
        assert_eq!(confirmed, format!("Report {id} is now Entregado.\n"));

        let shown = run_show(
            &catalog,
            &AppConfig::default(),
            &ShowArgs { id, json: false },
            OffsetDateTime::now_utc(),
        )
        .await?;
        assert!(shown.contains("status    Entregado"));
        assert!(shown.contains("Negro, con cargador"));
        Ok(())
    }

    #[tokio::test]
    async fn cli_report_rejects_reward_on_found_items() -> TestResult {
        let (_temp, store) = setup_storage()?;
        let catalog = ReportCatalog::new(store);
        let mut args = report_args(ReportKind::Found, "Paraguas");
        args.reward = Some(10.0);
        let err = run_report(&catalog, args).await.expect_err("reward on found");
        assert!(err.to_string().contains("reward_amount"));
        Ok(())
    }

    #[tokio::test]
    async fn cli_report_lists_valid_locations() -> TestResult {
        let (_temp, store) = setup_storage()?;
        let catalog = ReportCatalog::new(store);
        let mut args = report_args(ReportKind::Lost, "Termo");
        args.location = "rooftop".into();
        let err = run_report(&catalog, args).await.expect_err("unknown location");
        assert!(err.to_string().contains("biblioteca, comedor, canchas"));
        Ok(())
    }

    #[tokio::test]
    async fn cli_show_unknown_id_is_not_found() -> TestResult {
        let (_temp, store) = setup_storage()?;
        let catalog = ReportCatalog::new(store);
        let err = run_show(
            &catalog,
            &AppConfig::default(),
            &ShowArgs {
                id: "missing".into(),
                json: false,
            },
            NOW,
        )
        .await
        .expect_err("unknown id");
        assert_eq!(err.to_string(), "no report with id missing");
        Ok(())
    }

    #[test]
    fn date_argument_requires_iso_format() {
        assert_eq!(
            parse_date("2025-11-05"),
            Ok(datetime!(2025-11-05 00:00 UTC).date())
        );
        assert!(parse_date("05/11/2025").is_err());
    }
}
