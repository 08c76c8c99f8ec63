use crate::llm::models::{recent_turns, ConversationTurn};

/// Relational layout the model is allowed to query (Brazilian e-commerce
/// dataset). Kept in sync with the tables the `execute_sql` procedure can see.
pub const SCHEMA_DESCRIPTION: &str = r#"
Tables:
- olist_customers(customer_id PK, customer_unique_id, customer_zip_code_prefix, customer_city, customer_state)
- olist_orders(order_id PK, customer_id FK -> olist_customers.customer_id, order_status, order_purchase_timestamp, order_approved_at, order_delivered_carrier_date, order_delivered_customer_date, order_estimated_delivery_date)
- olist_order_items(order_id FK -> olist_orders.order_id, order_item_id, product_id FK -> olist_products.product_id, seller_id FK -> olist_sellers.seller_id, shipping_limit_date, price, freight_value)
- olist_order_payments(order_id FK -> olist_orders.order_id, payment_sequential, payment_type, payment_installments, payment_value)
- olist_order_reviews(review_id, order_id FK -> olist_orders.order_id, review_score, review_comment_title, review_comment_message, review_creation_date, review_answer_timestamp)
- olist_products(product_id PK, product_category_name, product_name_lenght, product_description_lenght, product_photos_qty, product_weight_g, product_length_cm, product_height_cm, product_width_cm)
- olist_sellers(seller_id PK, seller_zip_code_prefix, seller_city, seller_state)
- olist_geolocation(geolocation_zip_code_prefix, geolocation_lat, geolocation_lng, geolocation_city, geolocation_state)
- product_category_name_translation(product_category_name PK, product_category_name_english)

Materialized view:
- mv_monthly_sales(month, order_count, revenue, avg_order_value) -- one row per purchase month, revenue = sum(payment_value)
"#;

pub const CHAT_PERSONA: &str = "You are a friendly data analyst assistant for an e-commerce analytics dashboard \
built on the Olist Brazilian e-commerce dataset (orders, customers, products, sellers, payments and reviews). \
Answer concisely and in plain English. When data is provided, ground your answer in it and do not invent numbers. \
If the user wants a chart or exact figures, suggest asking the question in analytics mode.";

/// Renders turns as `User: ...` / `Assistant: ...` lines.
pub fn render_history(history: &[ConversationTurn]) -> String {
    recent_turns(history)
        .iter()
        .map(|turn| format!("{}: {}", turn.role, turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn sql_prompt(question: &str, history: &[ConversationTurn]) -> String {
    let conversation = render_history(history);
    let conversation_block = if conversation.is_empty() {
        String::new()
    } else {
        format!("\n### Conversation so far:\n{}\n", conversation)
    };

    format!(
        r#"
### Instructions:
You translate analytics questions into a single read-only PostgreSQL query.
Adhere to these rules:
- Only produce one SELECT statement (a WITH prefix is allowed). Never modify data or schema.
- Use only the tables and columns listed in the schema below.
- Use table aliases to prevent ambiguity.
- When creating a ratio, always cast the numerator as float.
- Limit row-level results to 100 rows unless the question asks for more.
- If the question is not about the data, return an empty "sql" and answer in "explanation".

### Schema:
{}
{}
### Question:
{}

### Response format:
Respond with JSON only, no prose around it:
{{"sql": "<query or empty string>", "explanation": "<one or two sentences>", "visualizationType": "table|bar|line|pie|map|metric"}}
"#,
        SCHEMA_DESCRIPTION, conversation_block, question
    )
}

pub fn chat_prompt(question: &str, data_context: Option<&str>, history: &[ConversationTurn]) -> String {
    let mut prompt = String::from(CHAT_PERSONA);
    prompt.push_str("\n\n");

    if let Some(data) = data_context {
        prompt.push_str("Sample of the orders data:\n");
        prompt.push_str(data);
        prompt.push_str("\n\n");
    }

    let conversation = render_history(history);
    if !conversation.is_empty() {
        prompt.push_str("Conversation so far:\n");
        prompt.push_str(&conversation);
        prompt.push_str("\n\n");
    }

    prompt.push_str("User: ");
    prompt.push_str(question);
    prompt.push_str("\nAssistant:");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::models::Role;

    fn turn(role: Role, content: &str) -> ConversationTurn {
        ConversationTurn {
            role,
            content: content.to_string(),
            timestamp: None,
        }
    }

    #[test]
    fn sql_prompt_embeds_schema_question_and_history() {
        let history = vec![
            turn(Role::User, "orders by state"),
            turn(Role::Assistant, "Here they are"),
        ];
        let prompt = sql_prompt("and by city?", &history);
        assert!(prompt.contains("olist_orders"));
        assert!(prompt.contains("mv_monthly_sales"));
        assert!(prompt.contains("and by city?"));
        assert!(prompt.contains("User: orders by state\nAssistant: Here they are"));
        assert!(prompt.contains(r#""visualizationType""#));
    }

    #[test]
    fn chat_prompt_includes_data_when_present() {
        let prompt = chat_prompt("what's up?", Some("[{\"order_id\":\"a\"}]"), &[]);
        assert!(prompt.starts_with(CHAT_PERSONA));
        assert!(prompt.contains("Sample of the orders data"));
        assert!(prompt.ends_with("User: what's up?\nAssistant:"));

        let bare = chat_prompt("hi", None, &[]);
        assert!(!bare.contains("Sample of the orders data"));
        assert!(!bare.contains("Conversation so far"));
    }
}
