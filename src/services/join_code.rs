//! Human-typeable join codes made of two distinct four letter words.

use std::future::Future;

use rand::{Rng, seq::IndexedRandom};
use tracing::debug;

use crate::{
    dao::storage::{StorageError, StorageResult},
    error::ServiceError,
};

/// Word list used to build join codes.
pub const CODE_WORDS: [&str; 30] = [
    "PINK", "SAND", "MOON", "STAR", "WAVE", "FIRE", "SNOW", "MIST", "ROSE", "GOLD", "LIME", "BLUE",
    "DUNE", "COVE", "BIRD", "FROG", "WIND", "RAIN", "LEAF", "DUSK", "DAWN", "GLOW", "ECHO", "MOSS",
    "PEAK", "LAKE", "CLUE", "SHIP", "LION", "WOLF",
];

/// Number of codes tried before giving up.
pub const MAX_CODE_ATTEMPTS: usize = 10;

/// Pick two distinct words and concatenate them.
pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> String {
    CODE_WORDS.choose_multiple(rng, 2).copied().collect()
}

/// Draw codes from `next_code` until `insert` accepts one.
///
/// `insert` reports a taken code with [`StorageError::DuplicateCode`]; any
/// other storage failure aborts immediately.
pub async fn with_unique_code<G, F, Fut, T>(mut next_code: G, mut insert: F) -> Result<T, ServiceError>
where
    G: FnMut() -> String,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = StorageResult<T>>,
{
    for attempt in 1..=MAX_CODE_ATTEMPTS {
        let code = next_code();
        match insert(code.clone()).await {
            Ok(value) => return Ok(value),
            Err(StorageError::DuplicateCode { .. }) => {
                debug!(attempt, code = %code, "join code already taken; retrying");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(ServiceError::Conflict(
        "Unable to generate unique game code".into(),
    ))
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, io};

    use super::*;

    #[test]
    fn codes_are_two_distinct_words() {
        let mut rng = rand::rng();
        for _ in 0..200 {
            let code = generate(&mut rng);
            assert_eq!(code.len(), 8);
            let (first, second) = code.split_at(4);
            assert_ne!(first, second);
            assert!(CODE_WORDS.contains(&first));
            assert!(CODE_WORDS.contains(&second));
        }
    }

    #[tokio::test]
    async fn retries_until_a_free_code() {
        let calls = Cell::new(0);
        let result = with_unique_code(
            || "PINKSAND".to_string(),
            |code| {
                calls.set(calls.get() + 1);
                let taken = calls.get() < 3;
                async move {
                    if taken {
                        Err(StorageError::DuplicateCode { code })
                    } else {
                        Ok(code)
                    }
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(result, "PINKSAND");
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn gives_up_with_conflict() {
        let calls = Cell::new(0);
        let err = with_unique_code(
            || "MOONSTAR".to_string(),
            |code| {
                calls.set(calls.get() + 1);
                async move { Err::<(), _>(StorageError::DuplicateCode { code }) }
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ServiceError::Conflict(ref msg) if msg == "Unable to generate unique game code"));
        assert_eq!(calls.get(), MAX_CODE_ATTEMPTS);
    }

    #[tokio::test]
    async fn other_storage_errors_abort() {
        let calls = Cell::new(0);
        let err = with_unique_code(
            || "WOLFLION".to_string(),
            |_| {
                calls.set(calls.get() + 1);
                async {
                    Err::<(), _>(StorageError::unavailable(
                        "down".into(),
                        io::Error::other("boom"),
                    ))
                }
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ServiceError::Unavailable(_)));
        assert_eq!(calls.get(), 1);
    }
}
