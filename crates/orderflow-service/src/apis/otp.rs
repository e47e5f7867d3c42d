//! OTP endpoints: code issuance and verification.
//!
//! The OTP service owns the challenge lifecycle; this module adds the
//! account policy around it: issuance requires a bot-linked phone, signup
//! rejects existing profiles, login requires one, and the code itself is
//! delivered through the notification channel.

use orderflow_core::Engine;
use orderflow_notify::render;
use orderflow_otp::OtpError;
use orderflow_storage::StorageError;
use orderflow_types::{
	normalize_phone, ApiError, Collection, LinkedUser, OtpMode, OtpSendRequest, OtpSendResponse,
	OtpVerifyRequest, OtpVerifyResponse, Profile,
};

/// Processes a `POST /api/otp/send` request.
pub async fn send(engine: &Engine, request: OtpSendRequest) -> Result<OtpSendResponse, ApiError> {
	let phone = normalize_phone(&request.phone)
		.ok_or_else(|| ApiError::bad_request("bad_request", "phone required"))?;

	// The code travels over the messenger, so the phone must be linked.
	let link = lookup_link(engine, &phone).await?.ok_or_else(|| {
		ApiError::not_found(
			"not_registered",
			"Start the bot and confirm your number first",
		)
	})?;

	let registered = lookup_profile(engine, &phone).await?.is_some();
	match request.mode {
		OtpMode::Signup if registered => {
			return Err(ApiError::bad_request(
				"user_already_exists",
				"This number is already registered, use login instead",
			));
		}
		OtpMode::Login if !registered => {
			return Err(ApiError::not_found(
				"user_not_found",
				"This number is not registered, use signup instead",
			));
		}
		_ => {}
	}

	let code = engine
		.otp()
		.issue(&phone, request.mode)
		.await
		.map_err(map_otp_error)?;

	// Unlike lifecycle notifications the code delivery must not fail
	// silently, the caller has to know the code never arrived.
	if engine
		.notifier()
		.send_to_chat(link.chat_id, &render::otp_message(&code), None)
		.await
		.is_none()
	{
		return Err(ApiError::internal("Failed to deliver the code"));
	}

	Ok(OtpSendResponse {
		success: true,
		message: "The code was sent to your messenger chat".into(),
	})
}

/// Processes a `POST /api/otp/verify` request.
pub async fn verify(
	engine: &Engine,
	request: OtpVerifyRequest,
) -> Result<OtpVerifyResponse, ApiError> {
	let phone = normalize_phone(&request.phone)
		.ok_or_else(|| ApiError::bad_request("bad_request", "phone required"))?;

	engine
		.otp()
		.verify(&phone, &request.code, request.mode)
		.await
		.map_err(map_otp_error)?;

	let profile = lookup_profile(engine, &phone).await?;

	match request.mode {
		OtpMode::Signup => {
			if profile.is_some() {
				return Err(ApiError::bad_request(
					"user_already_exists",
					"This number is already registered",
				));
			}
			// Prefill from the messenger name where available.
			let (first_name, last_name) = match lookup_link(engine, &phone).await? {
				Some(link) => split_name(&link.full_name),
				None => (String::new(), String::new()),
			};
			Ok(OtpVerifyResponse {
				success: true,
				phone: phone.clone(),
				user: Profile {
					phone,
					first_name,
					last_name,
				},
				mode: OtpMode::Signup,
			})
		}
		OtpMode::Login => {
			let profile = profile.ok_or_else(|| {
				ApiError::not_found("user_not_found", "This number is not registered")
			})?;
			Ok(OtpVerifyResponse {
				success: true,
				phone,
				user: profile,
				mode: OtpMode::Login,
			})
		}
	}
}

async fn lookup_link(engine: &Engine, phone: &str) -> Result<Option<LinkedUser>, ApiError> {
	match engine
		.storage()
		.retrieve::<LinkedUser>(Collection::Users, phone)
		.await
	{
		Ok(link) => Ok(Some(link)),
		Err(StorageError::NotFound) => Ok(None),
		Err(e) => Err(ApiError::internal(e.to_string())),
	}
}

async fn lookup_profile(engine: &Engine, phone: &str) -> Result<Option<Profile>, ApiError> {
	match engine
		.storage()
		.retrieve::<Profile>(Collection::Profiles, phone)
		.await
	{
		Ok(profile) => Ok(Some(profile)),
		Err(StorageError::NotFound) => Ok(None),
		Err(e) => Err(ApiError::internal(e.to_string())),
	}
}

fn split_name(full_name: &str) -> (String, String) {
	match full_name.split_once(' ') {
		Some((first, last)) => (first.to_string(), last.to_string()),
		None => (full_name.to_string(), String::new()),
	}
}

fn map_otp_error(error: OtpError) -> ApiError {
	let message = error.to_string();
	match error {
		OtpError::NotFound => ApiError::bad_request("not_found", message),
		OtpError::TooSoon { retry_after } => ApiError::TooManyRequests {
			error: "too_soon".into(),
			message,
			retry_after: Some(retry_after),
		},
		OtpError::Expired => ApiError::bad_request("expired", message),
		OtpError::TooManyAttempts => ApiError::bad_request("too_many_attempts", message),
		OtpError::ModeMismatch => ApiError::bad_request("mode_mismatch", message),
		OtpError::WrongCode { .. } => ApiError::bad_request("wrong_code", message),
		OtpError::Storage(e) => ApiError::internal(e.to_string()),
	}
}
