// src/services/document_service.rs

use std::path::PathBuf;

use genpdf::{elements, style, Element};
use image::Luma;
use qrcode::QrCode;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{bill::{Bill, UnitType}, settings::Settings},
    services::{billing_service::BillingService, settings_service::SettingsService},
};

const FONT_FAMILY: &str = "Roboto";

/// Link de pagamento UPI para o QR Code da nota, se a loja tiver chave cadastrada.
pub fn upi_payment_uri(settings: &Settings, amount: Decimal) -> Option<String> {
    let upi_id = settings.upi_id.as_deref().map(str::trim).filter(|id| !id.is_empty())?;
    Some(format!(
        "upi://pay?pa={}&pn={}&am={:.2}&cu=INR",
        urlencoding::encode(upi_id),
        urlencoding::encode(&settings.shop_name),
        amount
    ))
}

fn unit_label(unit_type: UnitType) -> &'static str {
    match unit_type {
        UnitType::Strip => "strip",
        UnitType::Tablet => "tab",
    }
}

fn pdf_error(e: impl std::fmt::Display) -> AppError {
    AppError::InternalServerError(anyhow::anyhow!("PDF rendering failed: {}", e))
}

/// Monta a nota em A4. Bloqueante: chamar via `spawn_blocking`.
pub fn render_invoice(bill: &Bill, settings: &Settings, fonts_dir: &std::path::Path) -> Result<Vec<u8>, AppError> {
    let font_family = genpdf::fonts::from_files(fonts_dir, FONT_FAMILY, None)?;

    let mut doc = genpdf::Document::new(font_family);
    doc.set_title(format!("Invoice {}", bill.invoice_number()));
    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);

    // --- CABEÇALHO ---
    doc.push(elements::Paragraph::new(settings.shop_name.clone())
        .styled(style::Style::new().bold().with_font_size(18)));

    if !settings.address.is_empty() {
        doc.push(elements::Paragraph::new(settings.address.clone())
            .styled(style::Style::new().with_font_size(10)));
    }
    if let Some(phone) = &settings.phone {
        doc.push(elements::Paragraph::new(format!("Phone: {}", phone))
            .styled(style::Style::new().with_font_size(10)));
    }
    if settings.gst_enabled {
        if let Some(gst_number) = &settings.gst_number {
            doc.push(elements::Paragraph::new(format!("GSTIN: {}", gst_number))
                .styled(style::Style::new().with_font_size(10)));
        }
    }

    doc.push(elements::Break::new(1.5));

    doc.push(elements::Paragraph::new(format!("TAX INVOICE {}", bill.invoice_number()))
        .styled(style::Style::new().bold().with_font_size(14)));
    doc.push(elements::Paragraph::new(format!("Date: {}", bill.created_at.format("%d/%m/%Y %H:%M"))));
    doc.push(elements::Paragraph::new(format!(
        "Customer: {}",
        bill.customer_name.as_deref().unwrap_or("Walk-in customer")
    )));

    doc.push(elements::Break::new(2));

    // --- ITENS ---
    // Pesos: Remédio (4), Lote (2), Qtd (2), Preço (2), Total (2)
    let mut table = elements::TableLayout::new(vec![4, 2, 2, 2, 2]);
    table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

    let style_bold = style::Style::new().bold();
    table.row()
        .element(elements::Paragraph::new("Medicine").styled(style_bold))
        .element(elements::Paragraph::new("Batch").styled(style_bold))
        .element(elements::Paragraph::new("Qty").styled(style_bold))
        .element(elements::Paragraph::new("Rate").styled(style_bold))
        .element(elements::Paragraph::new("Amount").styled(style_bold))
        .push()
        .map_err(pdf_error)?;

    for item in &bill.items {
        table.row()
            .element(elements::Paragraph::new(item.name.clone()))
            .element(elements::Paragraph::new(item.batch_number.clone()))
            .element(elements::Paragraph::new(format!("{} {}", item.quantity, unit_label(item.unit_type))))
            .element(elements::Paragraph::new(format!("Rs {:.2}", item.selling_price)))
            .element(elements::Paragraph::new(format!("Rs {:.2}", item.total)))
            .push()
            .map_err(pdf_error)?;
    }

    doc.push(table);
    doc.push(elements::Break::new(1));

    // --- TOTAIS ---
    let mut totals: Vec<String> = vec![format!("Subtotal: Rs {:.2}", bill.subtotal)];
    if !bill.discount_amount.is_zero() {
        totals.push(format!("Discount ({}%): - Rs {:.2}", bill.discount_percent.normalize(), bill.discount_amount));
    }
    if !bill.gst_amount.is_zero() {
        totals.push(format!("GST ({}%): Rs {:.2}", bill.gst_percent.normalize(), bill.gst_amount));
    }
    for line in totals {
        let mut paragraph = elements::Paragraph::new(line);
        paragraph.set_alignment(genpdf::Alignment::Right);
        doc.push(paragraph);
    }

    let mut grand_total = elements::Paragraph::new(format!("GRAND TOTAL: Rs {:.2}", bill.grand_total));
    grand_total.set_alignment(genpdf::Alignment::Right);
    doc.push(grand_total.styled(style::Style::new().bold().with_font_size(12)));

    // --- PAGAMENTO (QR CODE UPI) ---
    if let Some(uri) = upi_payment_uri(settings, bill.grand_total) {
        doc.push(elements::Break::new(2));
        doc.push(elements::Paragraph::new("SCAN TO PAY (UPI)")
            .styled(style::Style::new().bold().with_font_size(12)));

        let code = QrCode::new(uri.as_bytes()).map_err(pdf_error)?;
        let image_buffer = code.render::<Luma<u8>>().build();
        let dynamic_image = image::DynamicImage::ImageLuma8(image_buffer);

        let pdf_image = elements::Image::from_dynamic_image(dynamic_image)?
            .with_scale(genpdf::Scale::new(0.5, 0.5));
        doc.push(pdf_image);
    }

    // --- RODAPÉ ---
    if !settings.invoice_footer.is_empty() {
        doc.push(elements::Break::new(2));
        doc.push(elements::Paragraph::new(settings.invoice_footer.clone())
            .styled(style::Style::new().italic().with_font_size(8)));
    }

    let mut buffer = Vec::new();
    doc.render(&mut buffer)?;
    Ok(buffer)
}

#[derive(Clone)]
pub struct DocumentService {
    billing_service: BillingService,
    settings_service: SettingsService,
    fonts_dir: PathBuf,
}

impl DocumentService {
    pub fn new(billing_service: BillingService, settings_service: SettingsService, fonts_dir: PathBuf) -> Self {
        Self { billing_service, settings_service, fonts_dir }
    }

    /// Gera o PDF da nota e marca a nota como impressa.
    pub async fn invoice_pdf(&self, bill_id: Uuid) -> Result<(Bill, Vec<u8>), AppError> {
        let bill = self.billing_service.get_bill(bill_id).await?;
        let settings = self.settings_service.get().await?;

        let fonts_dir = self.fonts_dir.clone();
        let render_bill = bill.clone();
        let pdf = tokio::task::spawn_blocking(move || render_invoice(&render_bill, &settings, &fonts_dir))
            .await
            .map_err(|e| anyhow::anyhow!("Invoice rendering task failed: {}", e))??;

        let bill = if bill.is_printed {
            bill
        } else {
            self.billing_service.set_printed(bill.id, true).await?
        };

        Ok((bill, pdf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::settings::tests::default_settings;

    #[test]
    fn upi_uri_requires_an_upi_id() {
        let settings = default_settings();
        assert_eq!(upi_payment_uri(&settings, Decimal::from(10)), None);
    }

    #[test]
    fn upi_uri_encodes_shop_name_and_amount() {
        let mut settings = default_settings();
        settings.upi_id = Some("shop@okbank".into());
        settings.shop_name = "Sai Medical & General".into();

        let uri = upi_payment_uri(&settings, Decimal::new(10080, 2)).expect("uri");
        assert_eq!(
            uri,
            "upi://pay?pa=shop%40okbank&pn=Sai%20Medical%20%26%20General&am=100.80&cu=INR"
        );
    }

    #[test]
    fn missing_fonts_surface_as_error() {
        let settings = default_settings();
        let now = chrono::Utc::now();
        let bill = Bill {
            id: Uuid::new_v4(),
            bill_number: 7,
            customer_name: None,
            items: Vec::new(),
            subtotal: Decimal::ZERO,
            discount_percent: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            gst_percent: Decimal::ZERO,
            gst_amount: Decimal::ZERO,
            grand_total: Decimal::ZERO,
            is_printed: false,
            created_at: now,
            updated_at: now,
        };

        let result = render_invoice(&bill, &settings, std::path::Path::new("/nonexistent/fonts"));
        assert!(result.is_err());
    }
}
