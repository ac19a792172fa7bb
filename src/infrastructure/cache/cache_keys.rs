pub fn group_balance_summary_key(group_id: &str, detailed: bool) -> String {
    format!("balance_summary:{}:{}", group_id, detailed)
}

pub fn period_list_key(group_id: &str) -> String {
    format!("periods:{}", group_id)
}

pub fn period_summary_key(group_id: &str, period_id: &str) -> String {
    format!("period_summary:{}:{}", group_id, period_id)
}

pub fn transaction_list_key(group_id: &str, period_id: &str) -> String {
    format!("transactions:{}:{}", group_id, period_id)
}

pub fn transaction_history_key(group_id: &str, transaction_id: &str) -> String {
    format!("history:{}:{}", group_id, transaction_id)
}

pub fn group_tag(group_id: &str) -> String {
    format!("group:{}", group_id)
}

pub fn period_tag(period_id: &str) -> String {
    format!("period:{}", period_id)
}
