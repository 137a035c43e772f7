use async_graphql::{EmptySubscription, Schema};

use super::mutations::MutationRoot;
use super::queries::QueryRoot;

/// The executable forum schema. No subscriptions.
pub type ForumSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema() -> ForumSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription).finish()
}
