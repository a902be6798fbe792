pub fn render_schema() -> String {
	let init = include_str!("../../../sql/init.sql");

	expand_includes(init)
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_tenants.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_tenants.sql")),
				"tables/002_leads.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_leads.sql")),
				"tables/003_consent_records.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_consent_records.sql")),
				"tables/004_sms_outbox.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_sms_outbox.sql")),
				"tables/005_webhook_events.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_webhook_events.sql")),
				"tables/006_alert_buffer.sql" =>
					out.push_str(include_str!("../../../sql/tables/006_alert_buffer.sql")),
				"tables/007_rate_limits.sql" =>
					out.push_str(include_str!("../../../sql/tables/007_rate_limits.sql")),
				"tables/008_conversation_logs.sql" =>
					out.push_str(include_str!("../../../sql/tables/008_conversation_logs.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn schema_expands_every_include() {
		let rendered = render_schema();

		assert!(!rendered.contains("\\ir "));
		assert!(rendered.contains("CREATE TABLE IF NOT EXISTS tenants"));
		assert!(rendered.contains("CREATE TABLE IF NOT EXISTS sms_outbox"));
		assert!(rendered.contains("CREATE TABLE IF NOT EXISTS consent_records"));
	}
}
