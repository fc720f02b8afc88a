use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    dto::categories::{CategoryList, CreateCategoryRequest, UpdateCategoryRequest},
    entity::{
        Categories,
        categories::{ActiveModel, Column as CategoryCol, Model as CategoryModel},
    },
    error::{AppError, AppResult, FieldErrors},
    models::Category,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

fn validate(name: Option<&str>, description: Option<&str>) -> AppResult<()> {
    let mut errors = FieldErrors::new();
    if name.is_some_and(|n| n.trim().is_empty()) {
        errors.insert("name".into(), vec!["The name field is required.".into()]);
    }
    if description.is_some_and(|d| d.trim().is_empty()) {
        errors.insert(
            "description".into(),
            vec!["The description field is required.".into()],
        );
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

async fn find_category(state: &AppState, id: Uuid) -> AppResult<CategoryModel> {
    Categories::find_by_id(id)
        .one(state.orm.as_ref())
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn list_categories(
    state: &AppState,
    pagination: Pagination,
) -> AppResult<ApiResponse<CategoryList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = Categories::find().order_by_asc(CategoryCol::Name);

    let total = finder.clone().count(state.orm.as_ref()).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(state.orm.as_ref())
        .await?
        .into_iter()
        .map(Category::from)
        .collect();

    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_category(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Category>> {
    let category = find_category(state, id).await?;
    Ok(ApiResponse::success("Category", Category::from(category), None))
}

pub async fn create_category(
    state: &AppState,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    validate(Some(&payload.name), Some(&payload.description))?;

    let now = Utc::now().fixed_offset();
    let category = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        description: Set(payload.description),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(state.orm.as_ref())
    .await?;

    Ok(ApiResponse::success(
        "Category created",
        Category::from(category),
        Some(Meta::empty()),
    ))
}

pub async fn update_category(
    state: &AppState,
    id: Uuid,
    payload: UpdateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    validate(payload.name.as_deref(), payload.description.as_deref())?;
    let existing = find_category(state, id).await?;

    let mut dirty = false;
    let mut active: ActiveModel = existing.clone().into();
    if let Some(name) = payload.name.filter(|n| *n != existing.name) {
        active.name = Set(name);
        dirty = true;
    }
    if let Some(description) = payload.description.filter(|d| *d != existing.description) {
        active.description = Set(description);
        dirty = true;
    }
    if !dirty {
        return Err(AppError::Unprocessable(
            "A different value must be specified to update".into(),
        ));
    }
    active.updated_at = Set(Utc::now().fixed_offset());

    let category = active.update(state.orm.as_ref()).await?;
    Ok(ApiResponse::success(
        "Updated",
        Category::from(category),
        Some(Meta::empty()),
    ))
}

pub async fn delete_category(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Category>> {
    let category = find_category(state, id).await?;
    category.clone().delete(state.orm.as_ref()).await?;

    Ok(ApiResponse::success(
        "Deleted",
        Category::from(category),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, MockDatabase};

    use super::*;
    use crate::test_support::{RecordingMailer, state_with};

    fn stored(name: &str) -> CategoryModel {
        let now = Utc::now().fixed_offset();
        CategoryModel {
            id: Uuid::new_v4(),
            name: name.into(),
            description: "desc".into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn blank_fields_are_rejected() {
        assert!(matches!(
            validate(Some(" "), None),
            Err(AppError::Validation(ref f)) if f.contains_key("name")
        ));
        assert!(validate(None, None).is_ok());
    }

    #[tokio::test]
    async fn missing_category_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<CategoryModel>::new()])
            .into_connection();
        let state = state_with(db, RecordingMailer::default());

        assert!(matches!(
            get_category(&state, Uuid::new_v4()).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn identical_update_is_unprocessable() {
        let category = stored("Toys");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![category.clone()]])
            .into_connection();
        let state = state_with(db, RecordingMailer::default());

        let err = update_category(
            &state,
            category.id,
            UpdateCategoryRequest {
                name: Some("Toys".into()),
                description: None,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Unprocessable(_)));
    }
}
