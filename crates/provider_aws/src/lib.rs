mod cloudformation;
mod rds;

pub use crate::cloudformation::CloudFormationTemplateService;
pub use crate::rds::RdsDatabaseService;
