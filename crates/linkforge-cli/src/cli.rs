use clap::{Args, Parser, Subcommand, ValueEnum};
use jiff::{SignedDuration, Timestamp};
use linkforge_core::{Direction, QueryFilter, SortKey, StatusFilter};
use std::path::PathBuf;

pub const DATA_FILE_ENV: &str = "LINKFORGE_DATA_FILE";
pub const COUNTER_FLOOR_ENV: &str = "LINKFORGE_COUNTER_FLOOR";
pub const LOG_ENV: &str = "LINKFORGE_LOG";

pub const DEFAULT_DATA_FILE: &str = "linkforge.json";
pub const DEFAULT_LOG: &str = "warn";

#[derive(Debug, Parser)]
#[command(name = "linkforge", about = "Manage short links in a local mapping store")]
pub struct Cli {
    /// JSON document holding the mappings.
    #[arg(long, env = DATA_FILE_ENV, default_value = DEFAULT_DATA_FILE)]
    pub data_file: PathBuf,

    /// Lowest counter value the code generator starts from.
    #[arg(long, env = COUNTER_FLOOR_ENV, default_value_t = linkforge_generator::seq::COUNTER_FLOOR)]
    pub counter_floor: i64,

    /// Log filter directives, e.g. `linkforge_storage=debug`.
    #[arg(long, env = LOG_ENV, default_value = DEFAULT_LOG)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Shorten a URL, with a custom alias or a generated code.
    Create(CreateArgs),
    /// Change the target or expiry of an existing mapping.
    Edit(EditArgs),
    /// Remove a mapping. Removing an unknown code is not an error.
    Delete { code: String },
    /// Print one mapping.
    Get { code: String },
    /// Print the mappings that match a filter.
    List(FilterArgs),
    /// Print how many mappings match a filter.
    Count(FilterArgs),
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    pub url: String,

    #[arg(long)]
    pub alias: Option<String>,

    /// Absolute expiry, RFC 3339.
    #[arg(long, conflicts_with = "expires_in")]
    pub expires_at: Option<Timestamp>,

    /// Expiry relative to now, e.g. `2h 30m` or `PT90M`.
    #[arg(long)]
    pub expires_in: Option<SignedDuration>,
}

#[derive(Debug, Args)]
pub struct EditArgs {
    pub code: String,

    #[arg(long)]
    pub url: Option<String>,

    #[arg(long, conflicts_with = "no_expiry")]
    pub expires_at: Option<Timestamp>,

    /// Remove the expiry so the mapping never expires.
    #[arg(long)]
    pub no_expiry: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    All,
    Active,
    Expired,
}

impl From<StatusArg> for StatusFilter {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::All => StatusFilter::All,
            StatusArg::Active => StatusFilter::Active,
            StatusArg::Expired => StatusFilter::Expired,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    #[value(name = "created-at")]
    CreatedAt,
    #[value(name = "code")]
    ShortCode,
    #[value(name = "url")]
    OriginalUrl,
    #[value(name = "expires-at")]
    ExpiresAt,
}

impl From<SortArg> for SortKey {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::CreatedAt => SortKey::CreatedAt,
            SortArg::ShortCode => SortKey::ShortCode,
            SortArg::OriginalUrl => SortKey::OriginalUrl,
            SortArg::ExpiresAt => SortKey::ExpiresAt,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct FilterArgs {
    /// Substring of the short code.
    #[arg(long)]
    pub code: Option<String>,

    #[arg(long)]
    pub code_case_sensitive: bool,

    /// Substring of the original URL.
    #[arg(long)]
    pub url: Option<String>,

    #[arg(long)]
    pub url_case_sensitive: bool,

    #[arg(long)]
    pub created_from: Option<Timestamp>,

    #[arg(long)]
    pub created_to: Option<Timestamp>,

    #[arg(long, value_enum, default_value_t = StatusArg::All)]
    pub status: StatusArg,

    #[arg(long, default_value_t = 0)]
    pub offset: usize,

    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long, value_enum, default_value_t = SortArg::CreatedAt)]
    pub sort: SortArg,

    #[arg(long)]
    pub desc: bool,
}

impl From<FilterArgs> for QueryFilter {
    fn from(args: FilterArgs) -> Self {
        QueryFilter {
            code_part: args.code,
            code_case_sensitive: args.code_case_sensitive,
            url_part: args.url,
            url_case_sensitive: args.url_case_sensitive,
            created_from: args.created_from,
            created_to: args.created_to,
            status: args.status.into(),
            offset: args.offset,
            limit: args.limit,
            sort: args.sort.into(),
            direction: if args.desc {
                Direction::Desc
            } else {
                Direction::Asc
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_flags_become_a_filter() {
        let cli = Cli::try_parse_from([
            "linkforge",
            "list",
            "--code",
            "promo",
            "--status",
            "active",
            "--sort",
            "code",
            "--desc",
            "--offset",
            "10",
            "--limit",
            "5",
        ])
        .unwrap();

        let Command::List(args) = cli.command else {
            panic!("expected list");
        };
        let filter = QueryFilter::from(args);
        assert_eq!(filter.code_part.as_deref(), Some("promo"));
        assert_eq!(filter.status, StatusFilter::Active);
        assert_eq!(filter.sort, SortKey::ShortCode);
        assert_eq!(filter.direction, Direction::Desc);
        assert_eq!(filter.offset, 10);
        assert_eq!(filter.limit, Some(5));
    }

    #[test]
    fn default_filter_matches_query_default() {
        let cli = Cli::try_parse_from(["linkforge", "count"]).unwrap();
        let Command::Count(args) = cli.command else {
            panic!("expected count");
        };
        assert_eq!(QueryFilter::from(args), QueryFilter::default());
    }

    #[test]
    fn negative_offset_is_rejected() {
        assert!(Cli::try_parse_from(["linkforge", "list", "--offset", "-1"]).is_err());
    }

    #[test]
    fn expiry_flags_conflict() {
        assert!(Cli::try_parse_from([
            "linkforge",
            "edit",
            "promo",
            "--expires-at",
            "2030-01-01T00:00:00Z",
            "--no-expiry",
        ])
        .is_err());

        assert!(Cli::try_parse_from([
            "linkforge",
            "create",
            "https://example.com",
            "--expires-at",
            "2030-01-01T00:00:00Z",
            "--expires-in",
            "1h",
        ])
        .is_err());
    }

    #[test]
    fn timestamps_parse_as_rfc3339() {
        let cli = Cli::try_parse_from([
            "linkforge",
            "create",
            "https://example.com",
            "--alias",
            "promo",
            "--expires-at",
            "2030-01-01T00:00:00Z",
        ])
        .unwrap();
        let Command::Create(args) = cli.command else {
            panic!("expected create");
        };
        assert_eq!(args.alias.as_deref(), Some("promo"));
        assert_eq!(
            args.expires_at,
            Some("2030-01-01T00:00:00Z".parse().unwrap())
        );
    }
}
