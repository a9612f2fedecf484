use tracing::{error, info};

use super::{Conversion, object_meta};
use crate::error::Result;
use crate::legacy;
use crate::types::{Category, CategorySpec, Resource};

impl Conversion<'_> {
    /// Creates a category per legacy category. Any failure other than the
    /// category already existing aborts the run.
    pub(super) fn create_categories(&mut self) -> Result<()> {
        let snapshot = self.snapshot;
        info!("convert {} categories", snapshot.categories.len());

        for category in &snapshot.categories {
            self.ctx.check()?;
            let resource = category_resource(category);
            match self.store.create_category(self.ctx, &resource) {
                Ok(_) => {
                    info!("create category {} success", resource.name());
                    self.report.categories.created += 1;
                }
                Err(e) if e.is_already_exists() => {
                    info!("category {} already exists", resource.name());
                    self.report.categories.existing += 1;
                }
                Err(e) => {
                    error!("create category {} failed: {e}", category.category_id);
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}

fn category_resource(category: &legacy::Category) -> Category {
    Category {
        metadata: object_meta(category.category_id.to_lowercase(), &category.owner),
        spec: CategorySpec {
            name: category.name.clone(),
            description: category.description.clone(),
            locale: category.locale.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CREATOR_ANNOTATION_KEY;

    #[test]
    fn test_category_resource() {
        let category = legacy::Category {
            category_id: "ctg-DB01".to_string(),
            name: "database".to_string(),
            description: "Databases".to_string(),
            locale: r#"{"zh_cn": "数据库"}"#.to_string(),
            owner: "system".to_string(),
            ..Default::default()
        };

        let resource = category_resource(&category);
        assert_eq!(resource.name(), "ctg-db01");
        assert_eq!(resource.spec.name, "database");
        assert_eq!(resource.spec.locale, category.locale);
        assert_eq!(
            resource.metadata.annotations[CREATOR_ANNOTATION_KEY],
            "admin"
        );
    }
}
