use crate::error::GeneratorError;

/// Trait for generating short codes.
///
/// Implementations are pure generators that don't interact with storage.
/// Returned codes are raw (not yet normalized); two distinct raw codes may
/// collide after normalization, which callers must handle.
pub trait Generator: Send + Sync + 'static {
    /// Generates the next code. Fails only once the code space is exhausted.
    fn generate(&self) -> Result<String, GeneratorError>;

    /// Position that a later [`resume_from`](Generator::resume_from) should
    /// restore, if the generator has one.
    fn checkpoint(&self) -> Option<i64> {
        None
    }

    /// Makes every future code come after `position`. Never moves backwards.
    fn resume_from(&self, _position: i64) {}
}
