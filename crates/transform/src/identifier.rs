use model::DbInstance;

/// Identifier of the instance whose subnet group name starts with `key`.
///
/// Stacks name their subnet group after themselves, so the stack name finds its
/// database. A blank key matches nothing.
pub fn resolve_instance_identifier<'a>(instances: &'a [DbInstance], key: &str) -> Option<&'a str> {
    let key: &str = key.trim();
    if key.is_empty() {
        return None;
    }

    instances
        .iter()
        .find(|instance| {
            instance
                .subnet_group_name
                .as_deref()
                .is_some_and(|group| group.starts_with(key))
        })
        .map(|instance| instance.identifier.as_str())
}

pub fn find_instance<'a>(instances: &'a [DbInstance], instance_id: &str) -> Option<&'a DbInstance> {
    instances
        .iter()
        .find(|instance| instance.identifier == instance_id)
}

pub fn backup_retention_period(instances: &[DbInstance], instance_id: &str) -> Option<i32> {
    find_instance(instances, instance_id).map(|instance| instance.backup_retention_period)
}
