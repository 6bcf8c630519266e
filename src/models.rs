// src/models.rs
// Request/response types for the EscalateAI backend
//
// Category and Tone are closed enums carrying their wire values through
// serde, so an unknown string is rejected at deserialization and the rest
// of the pipeline never sees an out-of-vocabulary value. Length bounds are
// enforced by GenerateRequest::validate() before anything touches the
// network.

use serde::{Deserialize, Serialize};

use crate::errors::{ValidationError, ValidationResult};

/// Complaint domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    CollegeHostel,
    InternetNetwork,
    EcommerceRefund,
    BankingUpi,
    RentLandlord,
    WorkplaceHr,
    CourierDelivery,
    HospitalBilling,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::CollegeHostel => "college_hostel",
            Category::InternetNetwork => "internet_network",
            Category::EcommerceRefund => "ecommerce_refund",
            Category::BankingUpi => "banking_upi",
            Category::RentLandlord => "rent_landlord",
            Category::WorkplaceHr => "workplace_hr",
            Category::CourierDelivery => "courier_delivery",
            Category::HospitalBilling => "hospital_billing",
        }
    }
}

/// Requested writing tone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Polite,
    Firm,
    Strict,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Polite => "polite",
            Tone::Firm => "firm",
            Tone::Strict => "strict",
        }
    }
}

/// Inbound body for POST /generate
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub category: Category,
    pub tone: Tone,

    pub title: String,
    pub description: String,

    #[serde(default)]
    pub incident_date: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub company_or_institution: Option<String>,
    #[serde(default)]
    pub recipient_name: Option<String>,
    #[serde(default)]
    pub order_or_ticket_id: Option<String>,

    pub desired_resolution: String,
    #[serde(default)]
    pub proof_available: bool,
}

fn check_length(field: &'static str, value: &str, min: usize, max: usize) -> ValidationResult {
    let len = value.chars().count();
    if len < min {
        return Err(ValidationError::TooShort { field, min });
    }
    if len > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

impl GenerateRequest {
    /// Enforce every length bound. Must pass before any provider call.
    pub fn validate(&self) -> ValidationResult {
        check_length("title", &self.title, 5, 200)?;
        check_length("description", &self.description, 20, 5000)?;
        check_length("desired_resolution", &self.desired_resolution, 5, 1000)?;
        Ok(())
    }
}

/// Symbolic markers for facts the user did not supply. The model is told to
/// emit these tokens verbatim so the final drafts never fabricate details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Date,
    Location,
    CompanyName,
    RecipientName,
    OrderId,
}

impl Placeholder {
    pub fn name(&self) -> &'static str {
        match self {
            Placeholder::Date => "DATE",
            Placeholder::Location => "LOCATION",
            Placeholder::CompanyName => "COMPANY_NAME",
            Placeholder::RecipientName => "RECIPIENT_NAME",
            Placeholder::OrderId => "ORDER_ID",
        }
    }

    /// Bracketed form inserted into prompts and drafts, e.g. "{{DATE}}".
    pub fn token(&self) -> String {
        format!("{{{{{}}}}}", self.name())
    }
}

/// An absent optional field and an empty string both count as unset.
pub fn is_unset(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

/// Placeholders for the optional fields left unset, in fixed field order.
/// Returned to the caller as `required_placeholders` and substituted into
/// the prompt context.
pub fn required_placeholders(request: &GenerateRequest) -> Vec<String> {
    let optional_fields: [(&Option<String>, Placeholder); 5] = [
        (&request.incident_date, Placeholder::Date),
        (&request.location, Placeholder::Location),
        (&request.company_or_institution, Placeholder::CompanyName),
        (&request.recipient_name, Placeholder::RecipientName),
        (&request.order_or_ticket_id, Placeholder::OrderId),
    ];

    optional_fields
        .iter()
        .filter(|(value, _)| is_unset(value))
        .map(|(_, placeholder)| placeholder.name().to_string())
        .collect()
}

/// Outbound body for POST /generate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub request_id: String,
    pub whatsapp_message: String,
    pub email_subject: String,
    pub email_body: String,
    pub escalation_subject: String,
    pub escalation_body: String,
    pub followup_message: String,
    pub tips: Vec<String>,
    pub required_placeholders: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> GenerateRequest {
        GenerateRequest {
            category: Category::EcommerceRefund,
            tone: Tone::Firm,
            title: "Refund not processed".to_string(),
            description: "My refund for a returned order has not arrived after 30 days."
                .to_string(),
            incident_date: Some("2026-08-01".to_string()),
            location: Some("Pune".to_string()),
            company_or_institution: Some("ShopFast".to_string()),
            recipient_name: Some("Support Team".to_string()),
            order_or_ticket_id: Some("ORD-1234".to_string()),
            desired_resolution: "Full refund within 7 days".to_string(),
            proof_available: true,
        }
    }

    #[test]
    fn test_enum_wire_values() {
        let category: Category = serde_json::from_str("\"banking_upi\"").unwrap();
        assert_eq!(category, Category::BankingUpi);
        assert_eq!(category.as_str(), "banking_upi");

        let tone: Tone = serde_json::from_str("\"strict\"").unwrap();
        assert_eq!(tone, Tone::Strict);

        // Out-of-vocabulary values are rejected at the serde boundary.
        assert!(serde_json::from_str::<Category>("\"astrology\"").is_err());
        assert!(serde_json::from_str::<Tone>("\"sarcastic\"").is_err());
    }

    #[test]
    fn test_validate_accepts_in_bounds_request() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_bounds_fields() {
        let mut request = valid_request();
        request.title = "Hey".to_string();
        assert_eq!(
            request.validate(),
            Err(ValidationError::TooShort { field: "title", min: 5 })
        );

        let mut request = valid_request();
        request.description = "too short".to_string();
        assert!(matches!(
            request.validate(),
            Err(ValidationError::TooShort { field: "description", .. })
        ));

        let mut request = valid_request();
        request.desired_resolution = "x".repeat(1001);
        assert_eq!(
            request.validate(),
            Err(ValidationError::TooLong { field: "desired_resolution", max: 1000 })
        );
    }

    #[test]
    fn test_length_bounds_count_chars_not_bytes() {
        let mut request = valid_request();
        // Five multibyte characters satisfy the 5-char minimum.
        request.title = "héllo".to_string();
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_placeholders_for_fully_specified_request() {
        assert!(required_placeholders(&valid_request()).is_empty());
    }

    #[test]
    fn test_placeholder_for_single_unset_field() {
        let mut request = valid_request();
        request.location = None;
        assert_eq!(required_placeholders(&request), vec!["LOCATION".to_string()]);
    }

    #[test]
    fn test_placeholders_keep_fixed_field_order() {
        let mut request = valid_request();
        request.order_or_ticket_id = None;
        request.incident_date = None;
        request.recipient_name = Some(String::new()); // empty string counts as unset
        assert_eq!(
            required_placeholders(&request),
            vec![
                "DATE".to_string(),
                "RECIPIENT_NAME".to_string(),
                "ORDER_ID".to_string()
            ]
        );
    }

    #[test]
    fn test_placeholder_token_form() {
        assert_eq!(Placeholder::Date.token(), "{{DATE}}");
        assert_eq!(Placeholder::CompanyName.token(), "{{COMPANY_NAME}}");
    }
}
