use crate::alias::AliasPolicy;
use crate::clock::{Clock, SystemClock};
use crate::error::{ErrorMapper, MappingError, PlainErrorMapper, Result};
use crate::generator::Generator;
use crate::record::MappingRecord;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};

/// Why a sink refused to persist a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistError {
    /// Another writer committed the same short code first.
    #[error("short code is already taken")]
    Occupied,
    #[error("{0}")]
    Storage(String),
}

/// The storage side of [`MappingCreator::create`].
///
/// `persist` must be an atomic insert-if-absent for the record's short code;
/// `contains` is only a cheap pre-check and may be stale by the time
/// `persist` runs.
#[async_trait]
pub trait MappingSink: Send + Sync {
    /// Whether `code` is currently bound to a mapping.
    fn contains(&self, code: &ShortCode) -> bool;

    /// Commits `record` unless its short code is already bound.
    async fn persist(&self, record: &MappingRecord) -> std::result::Result<(), PersistError>;
}

/// Resolves the short code for a new mapping and builds its record.
///
/// The creator is storage-agnostic: the generator, clock and error mapper are
/// injected here, and the existence check and persistence come from the
/// [`MappingSink`] passed to [`create`](MappingCreator::create).
pub struct MappingCreator<G> {
    generator: Arc<G>,
    policy: AliasPolicy,
    clock: Arc<dyn Clock>,
    errors: Arc<dyn ErrorMapper>,
}

impl<G: Generator> MappingCreator<G> {
    /// Creates a creator with the default alias policy, the system clock and
    /// the plain error mapper.
    pub fn new(generator: G) -> Self {
        Self {
            generator: Arc::new(generator),
            policy: AliasPolicy::default(),
            clock: Arc::new(SystemClock),
            errors: Arc::new(PlainErrorMapper),
        }
    }

    pub fn with_policy(mut self, policy: AliasPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_error_mapper(mut self, errors: impl ErrorMapper) -> Self {
        self.errors = Arc::new(errors);
        self
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn policy(&self) -> &AliasPolicy {
        &self.policy
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn error_mapper(&self) -> &dyn ErrorMapper {
        self.errors.as_ref()
    }

    /// Creates a mapping for `original_url`.
    ///
    /// With a custom `alias`, the alias is validated and normalized and the
    /// call fails with [`MappingError::Conflict`] if it is already bound.
    /// Without one, generated codes are drawn until a free one commits.
    pub async fn create<S>(
        &self,
        sink: &S,
        alias: Option<&str>,
        original_url: &str,
        expires_at: Option<Timestamp>,
    ) -> Result<MappingRecord>
    where
        S: MappingSink + ?Sized,
    {
        match alias {
            Some(alias) => {
                self.create_custom(sink, alias, original_url, expires_at)
                    .await
            }
            None => self.create_generated(sink, original_url, expires_at).await,
        }
    }

    async fn create_custom<S>(
        &self,
        sink: &S,
        alias: &str,
        original_url: &str,
        expires_at: Option<Timestamp>,
    ) -> Result<MappingRecord>
    where
        S: MappingSink + ?Sized,
    {
        let code = self.policy.parse(alias).map_err(|violation| {
            debug!(alias, reason = violation.reason_code(), "rejected custom alias");
            MappingError::validation(violation, self.error_mapper())
        })?;

        if sink.contains(&code) {
            debug!(code = %code, "custom alias already bound");
            return Err(MappingError::conflict(code, self.error_mapper()));
        }

        let record = self.record(code, original_url, expires_at);
        match sink.persist(&record).await {
            Ok(()) => {
                debug!(code = %record.short_code, "created mapping with custom alias");
                Ok(record)
            }
            Err(PersistError::Occupied) => {
                debug!(code = %record.short_code, "custom alias taken by a concurrent writer");
                Err(MappingError::conflict(record.short_code, self.error_mapper()))
            }
            Err(PersistError::Storage(message)) => {
                Err(MappingError::storage(message, self.error_mapper()))
            }
        }
    }

    async fn create_generated<S>(
        &self,
        sink: &S,
        original_url: &str,
        expires_at: Option<Timestamp>,
    ) -> Result<MappingRecord>
    where
        S: MappingSink + ?Sized,
    {
        loop {
            let code = self.next_free_code(sink)?;
            let record = self.record(code, original_url, expires_at);

            match sink.persist(&record).await {
                Ok(()) => {
                    debug!(code = %record.short_code, "created mapping with generated code");
                    return Ok(record);
                }
                Err(PersistError::Occupied) => {
                    trace!(code = %record.short_code, "generated code lost a race, retrying");
                }
                Err(PersistError::Storage(message)) => {
                    return Err(MappingError::storage(message, self.error_mapper()));
                }
            }
        }
    }

    /// Draws codes until one is not bound in `sink`.
    ///
    /// Terminates because the generator never repeats a value and fails
    /// once its counter is exhausted.
    fn next_free_code<S>(&self, sink: &S) -> Result<ShortCode>
    where
        S: MappingSink + ?Sized,
    {
        loop {
            let raw = self
                .generator
                .generate()
                .map_err(|e| MappingError::exhausted(e, self.error_mapper()))?;
            let code = self.policy.normalize(&raw);

            if !sink.contains(&code) {
                return Ok(code);
            }
            trace!(code = %code, "generated code already bound, retrying");
        }
    }

    fn record(
        &self,
        short_code: ShortCode,
        original_url: &str,
        expires_at: Option<Timestamp>,
    ) -> MappingRecord {
        MappingRecord {
            short_code,
            original_url: original_url.to_string(),
            created_at: self.clock.now(),
            expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::GeneratorError;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Hands out a fixed script of codes, then reports exhaustion.
    struct ScriptedGenerator(Mutex<VecDeque<&'static str>>);

    impl ScriptedGenerator {
        fn new(codes: &[&'static str]) -> Self {
            Self(Mutex::new(codes.iter().copied().collect()))
        }
    }

    impl Generator for ScriptedGenerator {
        fn generate(&self) -> std::result::Result<String, GeneratorError> {
            self.0
                .lock()
                .unwrap()
                .pop_front()
                .map(str::to_string)
                .ok_or(GeneratorError::Exhausted(0))
        }
    }

    #[derive(Default)]
    struct MapSink {
        records: Mutex<HashMap<ShortCode, MappingRecord>>,
        /// Codes reported free by `contains` but occupied on `persist`.
        racing: Mutex<Vec<ShortCode>>,
        fail_with: Option<String>,
    }

    #[async_trait]
    impl MappingSink for MapSink {
        fn contains(&self, code: &ShortCode) -> bool {
            self.records.lock().unwrap().contains_key(code)
        }

        async fn persist(&self, record: &MappingRecord) -> std::result::Result<(), PersistError> {
            if let Some(message) = &self.fail_with {
                return Err(PersistError::Storage(message.clone()));
            }
            let mut racing = self.racing.lock().unwrap();
            if let Some(pos) = racing.iter().position(|c| c == &record.short_code) {
                racing.remove(pos);
                return Err(PersistError::Occupied);
            }
            let mut records = self.records.lock().unwrap();
            if records.contains_key(&record.short_code) {
                return Err(PersistError::Occupied);
            }
            records.insert(record.short_code.clone(), record.clone());
            Ok(())
        }
    }

    fn creator(codes: &[&'static str]) -> MappingCreator<ScriptedGenerator> {
        let clock = ManualClock::new(Timestamp::from_second(1_700_000_000).unwrap());
        MappingCreator::new(ScriptedGenerator::new(codes)).with_clock(clock)
    }

    #[tokio::test]
    async fn custom_alias_is_normalized_and_stamped() {
        let sink = MapSink::default();
        let record = creator(&[])
            .create(&sink, Some("My-Alias"), "https://example.com", None)
            .await
            .unwrap();

        assert_eq!(record.short_code.as_str(), "my-alias");
        assert_eq!(record.original_url, "https://example.com");
        assert_eq!(record.created_at, Timestamp::from_second(1_700_000_000).unwrap());
        assert!(sink.contains(&ShortCode::normalize("my-alias")));
    }

    #[tokio::test]
    async fn invalid_alias_is_rendered_by_mapper() {
        let sink = MapSink::default();
        let creator = creator(&[])
            .with_error_mapper(|status: u16, _: &str, reason: &str| format!("{status}:{reason}"));

        let err = creator
            .create(&sink, Some("ab"), "https://example.com", None)
            .await
            .unwrap_err();

        assert!(matches!(err, MappingError::Validation { .. }));
        assert_eq!(err.rendered(), "400:TOO_SHORT");
        assert!(sink.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn reserved_alias_is_rejected() {
        let sink = MapSink::default();
        let err = creator(&[])
            .create(&sink, Some("Admin"), "https://example.com", None)
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "RESERVED");
    }

    #[tokio::test]
    async fn duplicate_alias_conflicts_case_insensitively() {
        let sink = MapSink::default();
        let creator = creator(&[]);

        creator
            .create(&sink, Some("promo"), "https://one.example", None)
            .await
            .unwrap();
        let err = creator
            .create(&sink, Some("PROMO"), "https://two.example", None)
            .await
            .unwrap_err();

        assert!(matches!(err, MappingError::Conflict { .. }));
        assert_eq!(err.status(), 409);
        assert_eq!(sink.records.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn custom_alias_losing_race_is_a_conflict() {
        let sink = MapSink::default();
        sink.racing.lock().unwrap().push(ShortCode::normalize("hot"));

        let err = creator(&[])
            .create(&sink, Some("hot"), "https://example.com", None)
            .await
            .unwrap_err();
        assert!(matches!(err, MappingError::Conflict { .. }));
    }

    #[tokio::test]
    async fn generated_code_skips_bound_codes() {
        let sink = MapSink::default();
        let creator = creator(&["1C", "1c", "1D"]);

        sink.records.lock().unwrap().insert(
            ShortCode::normalize("1c"),
            MappingRecord {
                short_code: ShortCode::normalize("1c"),
                original_url: "https://taken.example".to_string(),
                created_at: Timestamp::from_second(0).unwrap(),
                expires_at: None,
            },
        );

        // "1C" and "1c" both normalize to the bound "1c".
        let record = creator
            .create(&sink, None, "https://example.com", None)
            .await
            .unwrap();
        assert_eq!(record.short_code.as_str(), "1d");
    }

    #[tokio::test]
    async fn generated_code_retries_after_lost_race() {
        let sink = MapSink::default();
        sink.racing.lock().unwrap().push(ShortCode::normalize("aa1"));

        let record = creator(&["aa1", "aa2"])
            .create(&sink, None, "https://example.com", None)
            .await
            .unwrap();
        assert_eq!(record.short_code.as_str(), "aa2");
    }

    #[tokio::test]
    async fn exhausted_generator_is_reported() {
        let sink = MapSink::default();
        let err = creator(&[])
            .create(&sink, None, "https://example.com", None)
            .await
            .unwrap_err();
        assert!(matches!(err, MappingError::Exhausted { .. }));
        assert_eq!(err.status(), 503);
    }

    #[tokio::test]
    async fn storage_failure_propagates() {
        let sink = MapSink {
            fail_with: Some("disk full".to_string()),
            ..MapSink::default()
        };
        let err = creator(&["abc"])
            .create(&sink, None, "https://example.com", None)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            MappingError::Storage {
                message: "disk full".to_string(),
                rendered: "500 STORAGE_FAILURE: disk full".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn expiry_is_kept_verbatim() {
        let sink = MapSink::default();
        let past = Timestamp::from_second(10).unwrap();
        let record = creator(&["abc"])
            .create(&sink, None, "https://example.com", Some(past))
            .await
            .unwrap();
        assert_eq!(record.expires_at, Some(past));
    }
}
