// src/services/document_service.rs

use genpdf::{elements, style, Element};
use image::Luma;
use qrcode::QrCode;

use crate::{common::error::AppError, models::permit::Permit};

/// Tudo o que vai impresso na licença (nomes já resolvidos).
#[derive(Debug, Clone)]
pub struct PermitSheet {
    pub permit: Permit,
    pub organization_name: String,
    pub location_name: String,
    pub requestor_name: String,
    pub approver_name: Option<String>,
}

#[derive(Clone)]
pub struct DocumentService {
    fonts_dir: String,
}

fn pdf_error(e: impl std::fmt::Display) -> AppError {
    AppError::InternalServerError(anyhow::Error::msg(e.to_string()))
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

/// QR Code com o número da licença (conferência em campo).
pub fn qr_element(data: &str) -> Result<elements::Image, AppError> {
    let code = QrCode::new(data.as_bytes()).map_err(pdf_error)?;

    // Renderiza para imagem
    let image_buffer = code.render::<Luma<u8>>().build();
    let dynamic_image = image::DynamicImage::ImageLuma8(image_buffer);

    Ok(elements::Image::from_dynamic_image(dynamic_image)
        .map_err(pdf_error)?
        .with_scale(genpdf::Scale::new(0.5, 0.5)))
}

impl DocumentService {
    pub fn new(fonts_dir: String) -> Self {
        Self { fonts_dir }
    }

    /// Gera o PDF fora do runtime assíncrono.
    pub async fn permit_pdf(&self, sheet: PermitSheet) -> Result<Vec<u8>, AppError> {
        let fonts_dir = self.fonts_dir.clone();
        tokio::task::spawn_blocking(move || render_permit(&fonts_dir, &sheet))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de geração do PDF: {}", e))?
    }
}

pub fn render_permit(fonts_dir: &str, sheet: &PermitSheet) -> Result<Vec<u8>, AppError> {
    let permit = &sheet.permit;

    let font_family = genpdf::fonts::from_files(fonts_dir, "Roboto", None).map_err(|e| {
        AppError::InternalServerError(anyhow::anyhow!("Fonte não encontrada em {}: {}", fonts_dir, e))
    })?;

    let mut doc = genpdf::Document::new(font_family);
    doc.set_title(format!("Permit {}", permit.permit_number));
    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);

    // --- CABEÇALHO ---
    doc.push(
        elements::Paragraph::new(sheet.organization_name.clone())
            .styled(style::Style::new().bold().with_font_size(18)),
    );
    doc.push(
        elements::Paragraph::new(format!("PERMIT TO WORK - {}", permit.work_type.label()))
            .styled(style::Style::new().bold().with_font_size(14)),
    );
    doc.push(elements::Paragraph::new(format!(
        "No. {}   Status: {:?}",
        permit.permit_number, permit.status
    )));
    doc.push(elements::Break::new(1.5));

    // --- DADOS ---
    let style_bold = style::Style::new().bold();
    let mut table = elements::TableLayout::new(vec![2, 5]);
    table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

    let schedule = format!(
        "{} to {} ({:.1} h)",
        permit.planned_start.format("%d/%m/%Y %H:%M"),
        permit.planned_end.format("%d/%m/%Y %H:%M"),
        permit.duration_hours()
    );
    let checklist = format!(
        "Toolbox talk: {} | Barricaded: {} | Equipment inspected: {} | Gas test: {}",
        yes_no(permit.toolbox_talk_done),
        yes_no(permit.area_barricaded),
        yes_no(permit.equipment_inspected),
        if permit.gas_test_done { permit.gas_test_result.as_str() } else { "No" },
    );

    let mut rows: Vec<(&str, String)> = vec![
        ("Title", permit.title.clone()),
        ("Location", format!("{} {}", sheet.location_name, permit.work_area).trim().to_string()),
        ("Requestor", sheet.requestor_name.clone()),
        ("Contractor", permit.contractor_name.clone()),
        ("Workers", permit.workers_count.to_string()),
        ("Schedule", schedule),
        ("Description", permit.description.clone()),
        ("Hazards", permit.hazards_identified.clone()),
        ("Controls", permit.risk_controls.clone()),
        ("PPE", permit.ppe_required.clone()),
        ("Emergency", permit.emergency_procedure.clone()),
        ("Checklist", checklist),
    ];
    if permit.isolation_required {
        rows.push(("Isolation (LOTO)", permit.isolation_details.clone()));
    }
    if let Some(approver) = &sheet.approver_name {
        let at = permit
            .approved_at
            .map(|d| d.format("%d/%m/%Y %H:%M").to_string())
            .unwrap_or_default();
        rows.push(("Approved by", format!("{} {}", approver, at).trim().to_string()));
    }

    for (label, value) in rows {
        table
            .row()
            .element(elements::Paragraph::new(label).styled(style_bold))
            .element(elements::Paragraph::new(value))
            .push()
            .map_err(pdf_error)?;
    }

    doc.push(table);
    doc.push(elements::Break::new(2));

    // --- QR CODE ---
    doc.push(qr_element(&permit.permit_number)?);

    // 3. Renderiza para Buffer (Memória)
    let mut buffer = Vec::new();
    doc.render(&mut buffer).map_err(pdf_error)?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qr_code_encodes_permit_number() {
        assert!(qr_element("PTW-20260514-0003").is_ok());
    }

    #[test]
    fn missing_fonts_is_an_internal_error() {
        use crate::models::permit::PermitPayload;
        use chrono::{Duration, Utc};
        use uuid::Uuid;

        let now = Utc::now();
        let payload: PermitPayload = serde_json::from_value(serde_json::json!({
            "workType": "electrical",
            "title": "Panel swap",
            "description": "Replace MCC panel",
            "locationId": Uuid::new_v4(),
            "plannedStart": now,
            "plannedEnd": now + Duration::hours(4),
            "hazardsIdentified": "Arc flash",
            "riskControls": "LOTO",
        }))
        .unwrap();
        let sheet = PermitSheet {
            permit: payload.into_draft(Uuid::new_v4(), Uuid::new_v4(), "PTW-20260514-0001".into(), now),
            organization_name: "Acme".into(),
            location_name: "Substation".into(),
            requestor_name: "Alice".into(),
            approver_name: None,
        };

        let err = render_permit("./no-such-fonts-dir", &sheet).unwrap_err();
        assert!(matches!(err, AppError::InternalServerError(_)));
    }
}
