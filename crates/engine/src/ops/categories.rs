use sea_orm::{ActiveModelTrait, QueryFilter, QueryOrder, prelude::*, sea_query::Expr};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{Category, EngineError, ResultEngine, categories, transactions, validation};

use super::{Engine, with_tx};

impl Engine {
    /// Validates and stores a new category.
    pub async fn create_category<T: Serialize + ?Sized>(&self, data: &T) -> ResultEngine<Category> {
        self.ensure_initialized()?;
        let category = Category::from_input(&validation::to_raw(data)?)?;

        with_tx!(self, |db_tx| {
            if categories::Entity::find_by_id(category.id.as_str())
                .one(&db_tx)
                .await?
                .is_some()
            {
                return Err(EngineError::ExistingKey(category.id.clone()));
            }
            let model: categories::ActiveModel = (&category).into();
            model
                .insert(&db_tx)
                .await
                .map_err(|err| EngineError::from_insert(err, &category.id))?;
            Ok(())
        })?;

        info!(category_id = %category.id, "category created");
        Ok(category)
    }

    /// Every category, by name.
    ///
    /// Never fails: before init or on a storage error the result is empty and
    /// a warning is logged.
    pub async fn categories(&self) -> Vec<Category> {
        if !self.readable("categories") {
            return Vec::new();
        }
        match self.load_categories().await {
            Ok(categories) => categories,
            Err(err) => {
                warn!(%err, "failed to read categories, returning an empty list");
                Vec::new()
            }
        }
    }

    async fn load_categories(&self) -> ResultEngine<Vec<Category>> {
        let models = categories::Entity::find()
            .order_by_asc(categories::Column::Name)
            .all(&self.database)
            .await?;
        debug!(count = models.len(), "categories loaded");
        models.into_iter().map(Category::try_from).collect()
    }

    /// Replaces every field of an existing category.
    pub async fn update_category<T: Serialize + ?Sized>(&self, data: &T) -> ResultEngine<Category> {
        self.ensure_initialized()?;
        let category = Category::from_input(&validation::to_raw(data)?)?;

        let model: categories::ActiveModel = (&category).into();
        model.update(&self.database).await.map_err(|err| match err {
            DbErr::RecordNotUpdated => EngineError::NotFound(format!("category {}", category.id)),
            other => other.into(),
        })?;

        info!(category_id = %category.id, "category updated");
        Ok(category)
    }

    /// Deletes a category. Its transactions stay, with no category.
    pub async fn delete_category(&self, id: &str) -> ResultEngine<()> {
        self.ensure_initialized()?;
        with_tx!(self, |db_tx| {
            let detached = transactions::Entity::update_many()
                .col_expr(transactions::Column::CategoryId, Expr::value(Option::<String>::None))
                .filter(transactions::Column::CategoryId.eq(id))
                .exec(&db_tx)
                .await?
                .rows_affected;

            let result = categories::Entity::delete_by_id(id).exec(&db_tx).await?;
            if result.rows_affected == 0 {
                return Err(EngineError::NotFound(format!("category {id}")));
            }

            info!(category_id = id, detached, "category deleted");
            Ok(())
        })
    }
}
