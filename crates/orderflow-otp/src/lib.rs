//! One-time password challenges for the ordering backend.
//!
//! This module owns the OTP lifecycle: issuance with a resend cooldown,
//! and verification with expiry, attempt-cap and mode checks. Delivery of
//! the code to the customer is not handled here; callers pass the returned
//! code to the notification channel.

use chrono::{Duration, Utc};
use orderflow_storage::{StorageError, StorageService};
use orderflow_types::{Collection, OtpChallenge, OtpMode};
use rand::Rng;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during OTP operations.
///
/// Each variant carries enough context for a distinct user-facing message
/// with a remediation hint.
#[derive(Debug, Error)]
pub enum OtpError {
	/// No live challenge exists for the phone.
	#[error("No code issued for this phone, request a new one")]
	NotFound,
	/// A code was issued too recently; retry after the given seconds.
	#[error("A code was sent recently, wait {retry_after}s and resend")]
	TooSoon { retry_after: u64 },
	/// The challenge expired; it has been discarded.
	#[error("The code expired, request a new one")]
	Expired,
	/// The attempt cap was exceeded; the challenge has been discarded.
	#[error("Too many wrong attempts, request a new code")]
	TooManyAttempts,
	/// The code was issued for a different flow.
	#[error("The code was issued for a different flow, request a new one")]
	ModeMismatch,
	/// The code does not match; the given number of attempts remain.
	#[error("Wrong code, {attempts_left} attempts left")]
	WrongCode { attempts_left: u32 },
	/// The storage backend failed.
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
}

/// Service issuing and verifying OTP challenges.
pub struct OtpService {
	storage: Arc<StorageService>,
	/// Challenge lifetime.
	ttl: Duration,
	/// Minimum interval between issuances per phone.
	cooldown: Duration,
	/// Wrong attempts after which a challenge is discarded.
	max_attempts: u32,
}

impl OtpService {
	/// Creates a new OtpService with the given limits.
	pub fn new(
		storage: Arc<StorageService>,
		ttl_seconds: u64,
		cooldown_seconds: u64,
		max_attempts: u32,
	) -> Self {
		Self {
			storage,
			ttl: Duration::seconds(ttl_seconds as i64),
			cooldown: Duration::seconds(cooldown_seconds as i64),
			max_attempts,
		}
	}

	/// Issues a fresh challenge for the phone and returns its code.
	///
	/// Rejects with [`OtpError::TooSoon`] inside the rolling cooldown
	/// window; otherwise any previous challenge is replaced.
	pub async fn issue(&self, phone: &str, mode: OtpMode) -> Result<String, OtpError> {
		let now = Utc::now();

		match self
			.storage
			.retrieve::<OtpChallenge>(Collection::Otp, phone)
			.await
		{
			Ok(existing) => {
				let elapsed = now - existing.created_at;
				if elapsed < self.cooldown {
					let retry_after = (self.cooldown - elapsed).num_seconds().max(1) as u64;
					return Err(OtpError::TooSoon { retry_after });
				}
			}
			Err(StorageError::NotFound) => {}
			Err(e) => return Err(e.into()),
		}

		let code = generate_code();
		let challenge = OtpChallenge {
			code: code.clone(),
			mode,
			expires_at: now + self.ttl,
			attempts: 0,
			created_at: now,
		};
		self.storage
			.store(Collection::Otp, phone, &challenge)
			.await?;

		tracing::info!(phone, %mode, "Issued verification code");
		Ok(code)
	}

	/// Verifies a code for the phone, consuming the challenge on success.
	///
	/// Expired challenges and challenges past the attempt cap are discarded
	/// as a side effect, forcing a re-issuance.
	pub async fn verify(&self, phone: &str, code: &str, mode: OtpMode) -> Result<(), OtpError> {
		let challenge = match self
			.storage
			.retrieve::<OtpChallenge>(Collection::Otp, phone)
			.await
		{
			Ok(challenge) => challenge,
			Err(StorageError::NotFound) => return Err(OtpError::NotFound),
			Err(e) => return Err(e.into()),
		};

		if Utc::now() > challenge.expires_at {
			self.storage.remove(Collection::Otp, phone).await?;
			return Err(OtpError::Expired);
		}

		if challenge.attempts >= self.max_attempts {
			self.storage.remove(Collection::Otp, phone).await?;
			return Err(OtpError::TooManyAttempts);
		}

		if challenge.mode != mode {
			return Err(OtpError::ModeMismatch);
		}

		if challenge.code != code.trim() {
			let attempts = self
				.storage
				.mutate::<OtpChallenge, _, _>(Collection::Otp, phone, |c| {
					c.attempts += 1;
					c.attempts
				})
				.await?;
			let attempts_left = self.max_attempts.saturating_sub(attempts);
			return Err(OtpError::WrongCode { attempts_left });
		}

		self.storage.remove(Collection::Otp, phone).await?;
		Ok(())
	}
}

/// Generates a six digit code.
fn generate_code() -> String {
	let mut rng = rand::thread_rng();
	format!("{:06}", rng.gen_range(100_000..=999_999))
}

#[cfg(test)]
mod tests {
	use super::*;
	use orderflow_storage::implementations::memory::MemoryStorage;

	const PHONE: &str = "+998901234567";

	fn service_with(ttl: u64, cooldown: u64) -> OtpService {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		OtpService::new(storage, ttl, cooldown, 5)
	}

	#[tokio::test]
	async fn issued_code_verifies_once() {
		let otp = service_with(300, 0);
		let code = otp.issue(PHONE, OtpMode::Login).await.unwrap();
		assert_eq!(code.len(), 6);
		assert!(code.chars().all(|c| c.is_ascii_digit()));

		otp.verify(PHONE, &code, OtpMode::Login).await.unwrap();
		// Consumed on success.
		assert!(matches!(
			otp.verify(PHONE, &code, OtpMode::Login).await,
			Err(OtpError::NotFound)
		));
	}

	#[tokio::test]
	async fn cooldown_blocks_immediate_reissue() {
		let otp = service_with(300, 60);
		otp.issue(PHONE, OtpMode::Login).await.unwrap();
		let result = otp.issue(PHONE, OtpMode::Login).await;
		assert!(matches!(result, Err(OtpError::TooSoon { retry_after }) if retry_after <= 60));
	}

	#[tokio::test]
	async fn reissue_replaces_the_previous_challenge() {
		let otp = service_with(300, 0);
		let first = otp.issue(PHONE, OtpMode::Login).await.unwrap();
		let second = otp.issue(PHONE, OtpMode::Login).await.unwrap();
		if first != second {
			assert!(matches!(
				otp.verify(PHONE, &first, OtpMode::Login).await,
				Err(OtpError::WrongCode { .. })
			));
		}
		otp.verify(PHONE, &second, OtpMode::Login).await.unwrap();
	}

	#[tokio::test]
	async fn expired_challenge_is_discarded_at_verify() {
		let otp = service_with(0, 0);
		let code = otp.issue(PHONE, OtpMode::Login).await.unwrap();
		tokio::time::sleep(std::time::Duration::from_millis(20)).await;
		assert!(matches!(
			otp.verify(PHONE, &code, OtpMode::Login).await,
			Err(OtpError::Expired)
		));
		// Discarded, not just rejected.
		assert!(matches!(
			otp.verify(PHONE, &code, OtpMode::Login).await,
			Err(OtpError::NotFound)
		));
	}

	#[tokio::test]
	async fn mode_must_match_issuance() {
		let otp = service_with(300, 0);
		let code = otp.issue(PHONE, OtpMode::Signup).await.unwrap();
		assert!(matches!(
			otp.verify(PHONE, &code, OtpMode::Login).await,
			Err(OtpError::ModeMismatch)
		));
		// The challenge survives a mode mismatch.
		otp.verify(PHONE, &code, OtpMode::Signup).await.unwrap();
	}

	#[tokio::test]
	async fn attempt_cap_forces_reissue() {
		let otp = service_with(300, 0);
		let code = otp.issue(PHONE, OtpMode::Login).await.unwrap();
		let wrong = if code == "000000" { "111111" } else { "000000" };

		for expected_left in (0..5).rev() {
			let result = otp.verify(PHONE, wrong, OtpMode::Login).await;
			assert!(matches!(
				result,
				Err(OtpError::WrongCode { attempts_left }) if attempts_left == expected_left
			));
		}

		// Cap reached: even the right code is refused and the challenge dies.
		assert!(matches!(
			otp.verify(PHONE, &code, OtpMode::Login).await,
			Err(OtpError::TooManyAttempts)
		));
		assert!(matches!(
			otp.verify(PHONE, &code, OtpMode::Login).await,
			Err(OtpError::NotFound)
		));
	}
}
