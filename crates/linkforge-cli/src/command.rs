use crate::cli::{Command, CreateArgs, EditArgs};
use anyhow::{bail, Context};
use jiff::Timestamp;
use linkforge_core::{
    ErrorMapper, ExpiryPatch, MappingError, MappingPatch, MappingRecord, MappingStore,
    QueryFilter, ShortCode,
};
use std::io::Write;
use tracing::debug;

/// Runs `command` against `store` and writes its output to `out`.
///
/// `now` is used for relative expiries and for the status column. `errors`
/// renders failures the store itself does not produce, so it should be the
/// mapper the store was built with.
pub async fn execute<S, W>(
    store: &S,
    errors: &dyn ErrorMapper,
    command: Command,
    now: Timestamp,
    out: &mut W,
) -> anyhow::Result<()>
where
    S: MappingStore,
    W: Write,
{
    match command {
        Command::Create(args) => {
            let record = create(store, args, now).await?;
            writeln!(out, "{}", format_record(&record, now))?;
        }
        Command::Edit(args) => {
            let record = edit(store, args).await?;
            writeln!(out, "{}", format_record(&record, now))?;
        }
        Command::Delete { code } => {
            let code = ShortCode::normalize(&code);
            if store.delete(code.as_str()).await? {
                writeln!(out, "deleted {code}")?;
            } else {
                writeln!(out, "no mapping for {code}")?;
            }
        }
        Command::Get { code } => {
            let code = ShortCode::normalize(&code);
            let record = store
                .find_by_short_code(code.as_str())
                .await
                .ok_or_else(|| MappingError::not_found(code, errors))?;
            writeln!(out, "{}", format_record(&record, now))?;
        }
        Command::List(args) => {
            let filter = QueryFilter::from(args);
            let records = store.find(&filter).await;
            debug!(returned = records.len(), "listed mappings");
            for record in &records {
                writeln!(out, "{}", format_record(record, now))?;
            }
        }
        Command::Count(args) => {
            let count = store.count(&QueryFilter::from(args)).await;
            writeln!(out, "{count}")?;
        }
    }
    Ok(())
}

async fn create<S: MappingStore>(
    store: &S,
    args: CreateArgs,
    now: Timestamp,
) -> anyhow::Result<MappingRecord> {
    let expires_at = match (args.expires_at, args.expires_in) {
        (Some(at), _) => Some(at),
        (None, Some(span)) => Some(
            now.checked_add(span)
                .with_context(|| format!("expiry {span} from now is out of range"))?,
        ),
        (None, None) => None,
    };

    Ok(store
        .create_mapping(args.alias.as_deref(), &args.url, expires_at)
        .await?)
}

async fn edit<S: MappingStore>(store: &S, args: EditArgs) -> anyhow::Result<MappingRecord> {
    let patch = MappingPatch {
        original_url: args.url,
        expires_at: if args.no_expiry {
            ExpiryPatch::Clear
        } else {
            args.expires_at.into()
        },
    };
    if patch.is_empty() {
        bail!("nothing to change, pass --url, --expires-at or --no-expiry");
    }

    Ok(store.edit_mapping(&args.code, patch).await?)
}

/// One tab-separated line per record.
pub fn format_record(record: &MappingRecord, now: Timestamp) -> String {
    let expires = record
        .expires_at
        .map_or_else(|| "-".to_string(), |at| at.to_string());
    let status = if record.is_active_at(now) {
        "active"
    } else {
        "expired"
    };
    format!(
        "{}\t{}\t{}\t{}\t{}",
        record.short_code, record.original_url, record.created_at, expires, status
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;
    use linkforge_core::MappingCreator;
    use linkforge_generator::SeqGenerator;
    use linkforge_storage::InMemoryMappingStore;

    async fn run(store: &InMemoryMappingStore, args: &[&str]) -> anyhow::Result<String> {
        let cli = Cli::try_parse_from(std::iter::once("linkforge").chain(args.iter().copied()))?;
        let mut out = Vec::new();
        execute(
            store,
            store.creator().error_mapper(),
            cli.command,
            Timestamp::now(),
            &mut out,
        )
        .await?;
        Ok(String::from_utf8(out)?)
    }

    #[tokio::test]
    async fn create_then_get() {
        let store = InMemoryMappingStore::new();

        let created = run(&store, &["create", "https://example.com", "--alias", "Promo"])
            .await
            .unwrap();
        assert!(created.starts_with("promo\thttps://example.com\t"));
        assert!(created.trim_end().ends_with("\t-\tactive"));

        let fetched = run(&store, &["get", "PROMO"]).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn get_unknown_code_is_not_found() {
        let store = InMemoryMappingStore::new();
        let err = run(&store, &["get", "missing"]).await.unwrap_err();
        let mapping = err.downcast_ref::<MappingError>().unwrap();
        assert_eq!(mapping.status(), 404);
        assert_eq!(mapping.rendered(), "404 NOT_FOUND: no mapping for short code 'missing'");
    }

    #[tokio::test]
    async fn get_renders_with_the_store_mapper() {
        let creator = MappingCreator::new(SeqGenerator::new())
            .with_error_mapper(|status: u16, _: &str, reason: &str| {
                format!(r#"{{"status":{status},"reason":"{reason}"}}"#)
            });
        let store = InMemoryMappingStore::with_creator(creator);

        let err = run(&store, &["get", "missing"]).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<MappingError>().unwrap().rendered(),
            r#"{"status":404,"reason":"NOT_FOUND"}"#
        );
    }

    #[tokio::test]
    async fn conflict_surfaces_as_mapping_error() {
        let store = InMemoryMappingStore::new();
        run(&store, &["create", "https://one.example", "--alias", "dup"])
            .await
            .unwrap();
        let err = run(&store, &["create", "https://two.example", "--alias", "DUP"])
            .await
            .unwrap_err();
        assert_eq!(err.downcast_ref::<MappingError>().unwrap().status(), 409);
    }

    #[tokio::test]
    async fn relative_expiry_in_the_past_lists_as_expired() {
        let store = InMemoryMappingStore::new();
        run(
            &store,
            &["create", "https://old.example", "--alias", "old", "--expires-in=-PT1H"],
        )
        .await
        .unwrap();
        run(&store, &["create", "https://new.example", "--alias", "new"])
            .await
            .unwrap();

        let expired = run(&store, &["list", "--status", "expired"]).await.unwrap();
        assert_eq!(expired.lines().count(), 1);
        assert!(expired.starts_with("old\t"));
        assert!(expired.trim_end().ends_with("expired"));

        let active = run(&store, &["count", "--status", "active"]).await.unwrap();
        assert_eq!(active, "1\n");
    }

    #[tokio::test]
    async fn edit_requires_a_change() {
        let store = InMemoryMappingStore::new();
        run(&store, &["create", "https://example.com", "--alias", "same"])
            .await
            .unwrap();
        assert!(run(&store, &["edit", "same"]).await.is_err());
    }

    #[tokio::test]
    async fn edit_clears_expiry() {
        let store = InMemoryMappingStore::new();
        run(
            &store,
            &[
                "create",
                "https://example.com",
                "--alias",
                "timed",
                "--expires-at",
                "2000-01-01T00:00:00Z",
            ],
        )
        .await
        .unwrap();

        let edited = run(&store, &["edit", "timed", "--no-expiry"]).await.unwrap();
        assert!(edited.trim_end().ends_with("\t-\tactive"));
        assert_eq!(
            store.find_by_short_code("timed").await.unwrap().expires_at,
            None
        );
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = InMemoryMappingStore::new();
        run(&store, &["create", "https://example.com", "--alias", "gone"])
            .await
            .unwrap();

        assert_eq!(run(&store, &["delete", "gone"]).await.unwrap(), "deleted gone\n");
        assert_eq!(
            run(&store, &["delete", "gone"]).await.unwrap(),
            "no mapping for gone\n"
        );
    }

    #[tokio::test]
    async fn list_pages_in_code_order() {
        let store = InMemoryMappingStore::new();
        for alias in ["ccc", "aaa", "bbb", "ddd"] {
            run(&store, &["create", "https://example.com", "--alias", alias])
                .await
                .unwrap();
        }

        let page = run(
            &store,
            &["list", "--sort", "code", "--desc", "--offset", "1", "--limit", "2"],
        )
        .await
        .unwrap();
        let codes: Vec<&str> = page
            .lines()
            .map(|line| line.split('\t').next().unwrap())
            .collect();
        assert_eq!(codes, ["ccc", "bbb"]);
    }
}
