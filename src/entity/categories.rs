use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::category_product::Entity")]
    CategoryProduct,
}

impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        super::category_product::Relation::Product.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::category_product::Relation::Category.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
