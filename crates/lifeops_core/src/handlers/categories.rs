//! Category handler.
//!
//! Deleting a category leaves referencing records in place with no category.

use super::{list_result, replacement_text, View};
use crate::action::bulk::{BulkDomain, BulkExecutor, Created};
use crate::action::context::ActionContext;
use crate::action::error::{ActionError, ActionOutcome};
use crate::action::fields::{DomainKeys, CATEGORY_KEYS, COLOR, ICON, NAME, SORT_INDEX};
use crate::action::filter::ListFilter;
use crate::action::params::Params;
use crate::action::result::{ActionResult, ItemView};
use crate::model::category::{normalize_color, Category};
use crate::model::EntityKind;
use crate::store::EntityStore;

#[derive(Debug)]
pub struct CategoryPatch {
    name: Option<String>,
    color: Option<String>,
    icon: Option<String>,
    sort_index: Option<i64>,
}

pub struct CategoryHandler<'a, S: EntityStore> {
    ctx: &'a ActionContext<S>,
}

impl<'a, S: EntityStore> CategoryHandler<'a, S> {
    pub fn new(ctx: &'a ActionContext<S>) -> Self {
        Self { ctx }
    }

    pub fn create(&self, params: &Params) -> ActionResult {
        BulkExecutor::<S, Self>::new(self).create(params)
    }

    pub fn update(&self, params: &Params) -> ActionResult {
        BulkExecutor::<S, Self>::new(self).update(params)
    }

    pub fn delete(&self, params: &Params) -> ActionResult {
        BulkExecutor::<S, Self>::new(self).delete(params)
    }

    pub fn list(&self, params: &Params) -> ActionResult {
        self.try_list(params)
            .unwrap_or_else(|err| ActionResult::failure(&err))
    }

    fn try_list(&self, params: &Params) -> ActionOutcome<ActionResult> {
        let filter = self.decode_filter(params)?;
        let items = self
            .ctx
            .store()
            .fetch(|category: &Category| self.matches(&filter, category))?
            .iter()
            .map(|category| self.view(category))
            .collect();
        Ok(list_result(EntityKind::Category, items, &filter))
    }

    pub fn view(&self, category: &Category) -> ItemView {
        View::new(category.id)
            .text("name", &category.name)
            .text("color", &category.color)
            .text("icon", &category.icon)
            .integer("sortIndex", category.sort_index)
            .timestamp("createdAt", category.created_at)
            .build()
    }

    fn color(&self, params: &Params) -> ActionOutcome<Option<String>> {
        let Some(raw) = params.string(&COLOR)?.filter(|raw| !raw.is_empty()) else {
            return Ok(None);
        };
        normalize_color(&raw).map(Some).ok_or_else(|| {
            ActionError::validation(format!(
                "field `{}` has invalid value `{raw}`; expected a hex color like #FF9500",
                COLOR.name
            ))
        })
    }
}

impl<S: EntityStore> BulkDomain<S> for CategoryHandler<'_, S> {
    type Entity = Category;
    type Patch = CategoryPatch;

    fn keys(&self) -> &'static DomainKeys {
        &CATEGORY_KEYS
    }

    fn ctx(&self) -> &ActionContext<S> {
        self.ctx
    }

    /// New categories go last unless a sort index is given.
    fn create_one(&self, params: &Params) -> ActionOutcome<Created<Category>> {
        let name = params.required_string(&NAME)?;
        let sort_index = match params.integer(&SORT_INDEX)? {
            Some(index) => index,
            None => self.ctx.store().count::<Category>()? as i64,
        };

        let mut category = Category::new(name, sort_index, self.ctx.now_ms());
        if let Some(color) = self.color(params)? {
            category.color = color;
        }
        if let Some(icon) = params.string(&ICON)?.filter(|icon| !icon.is_empty()) {
            category.icon = icon;
        }

        self.ctx.store().insert(&category)?;
        Ok(Created::new(category))
    }

    fn decode_patch(&self, params: &Params) -> ActionOutcome<CategoryPatch> {
        Ok(CategoryPatch {
            name: replacement_text(params, &NAME)?,
            color: self.color(params)?,
            icon: replacement_text(params, &ICON)?,
            sort_index: params.integer(&SORT_INDEX)?,
        })
    }

    fn patch_notes<'p>(&self, _patch: &'p CategoryPatch) -> &'p [String] {
        &[]
    }

    fn apply_patch(&self, category: &mut Category, patch: &CategoryPatch) -> ActionOutcome<()> {
        if let Some(name) = &patch.name {
            category.name = name.clone();
        }
        if let Some(color) = &patch.color {
            category.color = color.clone();
        }
        if let Some(icon) = &patch.icon {
            category.icon = icon.clone();
        }
        if let Some(sort_index) = patch.sort_index {
            category.sort_index = sort_index;
        }
        Ok(())
    }

    fn decode_filter(&self, params: &Params) -> ActionOutcome<ListFilter> {
        ListFilter::decode(self.ctx, params, &CATEGORY_KEYS, &[])
    }

    fn matches(&self, filter: &ListFilter, category: &Category) -> bool {
        filter.matches_id(category.id)
    }
}
