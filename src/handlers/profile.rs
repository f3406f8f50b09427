use axum::{Form, Json, extract::State, response::Redirect};

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, Result},
    forms::{ProfileForm, validate_form},
    permissions::profile_path,
};

/// edit_profile_form
///
/// [Authenticated Route] The current user's editable fields.
#[utoipa::path(
    get,
    path = "/profile/edit/",
    responses(
        (status = 200, description = "Profile form", body = ProfileForm),
        (status = 303, description = "Login required")
    )
)]
pub async fn edit_profile_form(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ProfileForm>> {
    let account = state
        .repo
        .get_user(user.id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {}", user.username)))?;
    Ok(Json(ProfileForm::from(&account)))
}

/// edit_profile
///
/// [Authenticated Route] Only ever touches the requester's own row.
#[utoipa::path(
    post,
    path = "/profile/edit/",
    request_body(content = ProfileForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Saved; redirect to the profile"),
        (status = 422, description = "Invalid form", body = crate::error::RejectedForm)
    )
)]
pub async fn edit_profile(
    user: AuthUser,
    State(state): State<AppState>,
    Form(form): Form<ProfileForm>,
) -> Result<Redirect> {
    validate_form(&form)?;

    let updated = state
        .repo
        .update_profile(user.id, &form)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {}", user.username)))?;

    Ok(Redirect::to(&profile_path(&updated.username)))
}
