//! Registered profile endpoints.

use orderflow_core::Engine;
use orderflow_storage::StorageError;
use orderflow_types::{
	normalize_phone, ApiError, CheckPhoneResponse, Collection, Profile, ProfileSaveRequest,
	ProfileSaveResponse,
};

/// Processes a `GET /api/check-phone` request.
pub async fn check_phone(engine: &Engine, phone: &str) -> Result<CheckPhoneResponse, ApiError> {
	let phone = normalize_phone(phone)
		.ok_or_else(|| ApiError::bad_request("bad_request", "phone required"))?;

	let exists = match engine
		.storage()
		.exists(Collection::Profiles, &phone)
		.await
	{
		Ok(exists) => exists,
		Err(e) => return Err(ApiError::internal(e.to_string())),
	};
	Ok(CheckPhoneResponse { exists })
}

/// Processes a `POST /api/users/profile` request.
///
/// Saving overwrites any existing profile for the phone.
pub async fn save(
	engine: &Engine,
	request: ProfileSaveRequest,
) -> Result<ProfileSaveResponse, ApiError> {
	let phone = normalize_phone(&request.phone)
		.ok_or_else(|| ApiError::bad_request("bad_request", "phone required"))?;
	let first_name = request.first_name.trim();
	if first_name.is_empty() {
		return Err(ApiError::bad_request(
			"bad_request",
			"firstName must not be empty",
		));
	}

	let profile = Profile {
		phone: phone.clone(),
		first_name: first_name.to_string(),
		last_name: request.last_name.trim().to_string(),
	};
	engine
		.storage()
		.store(Collection::Profiles, &phone, &profile)
		.await
		.map_err(|e| ApiError::internal(e.to_string()))?;

	tracing::info!(phone = %phone, "Profile saved");
	Ok(ProfileSaveResponse {
		success: true,
		user: profile,
	})
}

/// Processes a `GET /api/users/profile` request.
pub async fn get(engine: &Engine, phone: &str) -> Result<Profile, ApiError> {
	let phone = normalize_phone(phone)
		.ok_or_else(|| ApiError::bad_request("bad_request", "phone required"))?;

	match engine
		.storage()
		.retrieve::<Profile>(Collection::Profiles, &phone)
		.await
	{
		Ok(profile) => Ok(profile),
		Err(StorageError::NotFound) => Err(ApiError::not_found(
			"user_not_found",
			"This number is not registered",
		)),
		Err(e) => Err(ApiError::internal(e.to_string())),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::apis::testing;

	#[tokio::test]
	async fn save_then_fetch_round_trips() {
		let (engine, _channel) = testing::engine();

		let saved = save(
			&engine,
			ProfileSaveRequest {
				phone: "998901234567".into(),
				first_name: " Alex ".into(),
				last_name: "Karimov".into(),
			},
		)
		.await
		.unwrap();
		assert_eq!(saved.user.first_name, "Alex");
		assert_eq!(saved.user.phone, "+998901234567");

		let fetched = get(&engine, "+998901234567").await.unwrap();
		assert_eq!(fetched.last_name, "Karimov");

		let probe = check_phone(&engine, "998901234567").await.unwrap();
		assert!(probe.exists);
	}

	#[tokio::test]
	async fn missing_profiles_are_not_found() {
		let (engine, _channel) = testing::engine();
		assert!(matches!(
			get(&engine, "+998000000000").await,
			Err(ApiError::NotFound { .. })
		));
		assert!(!check_phone(&engine, "+998000000000").await.unwrap().exists);
	}

	#[tokio::test]
	async fn first_name_is_required() {
		let (engine, _channel) = testing::engine();
		let result = save(
			&engine,
			ProfileSaveRequest {
				phone: "998901234567".into(),
				first_name: "  ".into(),
				last_name: String::new(),
			},
		)
		.await;
		assert!(matches!(result, Err(ApiError::BadRequest { .. })));
	}
}
