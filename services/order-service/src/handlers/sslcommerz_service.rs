use reqwest::Client;

use crate::config::AppConfig;
use crate::domain::order::Order;
use crate::domain::payment::{
    PaymentStatus, SslcommerzSessionRequest, SslcommerzSessionResponse,
    SslcommerzValidationResponse,
};
use crate::error::AppError;

// Service untuk integrasi SSLCommerz
pub struct SslcommerzService {
    client: Client,
    store_id: String,
    store_passwd: String,
    api_url: String,
    validator_url: String,
    redirect_base_url: String,
    public_base_url: String,
}

impl SslcommerzService {
    // Buat SSLCommerz Service dari app config
    pub fn from_config(client: Client, config: &AppConfig) -> Self {
        Self {
            client,
            store_id: config.sslcommerz_store_id.clone(),
            store_passwd: config.sslcommerz_store_passwd.clone(),
            api_url: config.sslcommerz_api_url.clone(),
            validator_url: config.sslcommerz_validator_url.clone(),
            redirect_base_url: config.payment_redirect_base_url.clone(),
            public_base_url: config.public_base_url.clone(),
        }
    }

    // Convert order ke SSLCommerz session request format
    pub fn build_session_request(
        &self,
        order: &Order,
        transaction_id: &str,
        item_count: i32,
    ) -> SslcommerzSessionRequest {
        SslcommerzSessionRequest {
            store_id: self.store_id.clone(),
            store_passwd: self.store_passwd.clone(),
            total_amount: order.total,
            currency: "BDT".to_string(),
            tran_id: transaction_id.to_string(),
            success_url: format!("{}/success", self.redirect_base_url),
            fail_url: format!("{}/fail", self.redirect_base_url),
            cancel_url: format!("{}/cancel", self.redirect_base_url),
            ipn_url: format!("{}/api/payment/ipn", self.public_base_url),
            cus_name: order.customer_name.clone(),
            cus_email: order.customer_email.clone(),
            cus_add1: order.shipping_address.clone(),
            cus_phone: order.contact_phone.clone(),
            product_name: format!("Order {}", order.order_number),
            product_category: "general".to_string(),
            product_profile: "physical-goods".to_string(),
            shipping_method: "Courier".to_string(),
            num_of_item: item_count,
        }
    }

    // Create payment session di SSLCommerz (form-encoded v4 API)
    pub async fn create_session(
        &self,
        request: &SslcommerzSessionRequest,
    ) -> Result<SslcommerzSessionResponse, AppError> {
        let response = self
            .client
            .post(&self.api_url)
            .form(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::gateway(format!(
                "SSLCommerz session API error: {}",
                error_text
            )));
        }

        let session: SslcommerzSessionResponse = response
            .json()
            .await
            .map_err(|e| AppError::gateway(format!("Failed to parse SSLCommerz response: {}", e)))?;

        if session.status != "SUCCESS" {
            return Err(AppError::gateway(format!(
                "SSLCommerz rejected session: {}",
                session
                    .failedreason
                    .clone()
                    .unwrap_or_else(|| "no reason given".to_string())
            )));
        }

        Ok(session)
    }

    /// Verifikasi IPN lewat validator API; payload IPN mentah tidak pernah
    /// dipercaya untuk settle payment
    pub async fn validate_ipn(
        &self,
        val_id: &str,
    ) -> Result<SslcommerzValidationResponse, AppError> {
        let response = self
            .client
            .get(&self.validator_url)
            .query(&[
                ("val_id", val_id),
                ("store_id", self.store_id.as_str()),
                ("store_passwd", self.store_passwd.as_str()),
                ("format", "json"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("SSLCommerz validation failed: {}", error_text);
            return Err(AppError::gateway(format!(
                "SSLCommerz validator API error: {}",
                error_text
            )));
        }

        let validation: SslcommerzValidationResponse = response
            .json()
            .await
            .map_err(|e| AppError::gateway(format!("Failed to parse validator response: {}", e)))?;

        Ok(validation)
    }

    /// Convert SSLCommerz transaction status ke PaymentStatus
    pub fn convert_status(transaction_status: &str) -> PaymentStatus {
        match transaction_status {
            "VALID" | "VALIDATED" => PaymentStatus::Success,
            "PENDING" => PaymentStatus::Pending,
            "FAILED" => PaymentStatus::Failed,
            "CANCELLED" => PaymentStatus::Cancelled,
            "EXPIRED" => PaymentStatus::Expired,
            _ => PaymentStatus::Failed,
        }
    }

    /// Check apakah environment sandbox
    pub fn is_sandbox(&self) -> bool {
        self.api_url.contains("sandbox.sslcommerz.com")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_status_mapping() {
        assert_eq!(
            SslcommerzService::convert_status("VALID"),
            PaymentStatus::Success
        );
        assert_eq!(
            SslcommerzService::convert_status("VALIDATED"),
            PaymentStatus::Success
        );
        assert_eq!(
            SslcommerzService::convert_status("PENDING"),
            PaymentStatus::Pending
        );
        assert_eq!(
            SslcommerzService::convert_status("FAILED"),
            PaymentStatus::Failed
        );
        assert_eq!(
            SslcommerzService::convert_status("CANCELLED"),
            PaymentStatus::Cancelled
        );
        assert_eq!(
            SslcommerzService::convert_status("EXPIRED"),
            PaymentStatus::Expired
        );
    }

    #[test]
    fn test_unknown_status_is_failed() {
        assert_eq!(
            SslcommerzService::convert_status("SOMETHING_NEW"),
            PaymentStatus::Failed
        );
    }
}
