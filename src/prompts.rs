//! Prompts for company-name extraction.
//!
//! Callers can override the default via
//! [`crate::config::OrganizerConfig::prompt`]; the constant here is used
//! only when no override is provided.

/// Default instruction sent alongside the first-page image.
///
/// The fallback answer it asks for must stay equal to
/// [`crate::pipeline::clean::UNKNOWN_COMPANY`] so
/// the extractor recognises it as "no answer".
pub const COMPANY_NAME_PROMPT: &str = r#"Analyze this certificate image carefully and extract ONLY the company/organization name that issued this certificate.

Instructions:
1. Look for the PRIMARY company name that appears as the issuer/provider of the certificate
2. This is usually at the top of the certificate or in a prominent position
3. Return ONLY the company name, no additional text or explanations
4. If multiple company names appear, choose the main issuer (not partners or sponsors)
5. Remove common business suffixes like Inc., LLC, Ltd., Corp., Corporation, Company, etc.
6. If no clear company name is found, return "Unknown_Company"

Common certificate types and their issuers:
- Training certificates: Look for the training provider/platform name
- Professional certifications: Look for the certifying organization
- Course completion: Look for the educational institution or platform
- Achievement certificates: Look for the awarding organization

Examples:
- "Google LLC Certificate of Completion" → return "Google"
- "Microsoft Corporation Training Certificate" → return "Microsoft"
- "Amazon Web Services Certification" → return "Amazon Web Services"
- "Coursera Certificate" → return "Coursera"
- "edX Verified Certificate" → return "edX"
- "LinkedIn Learning Certificate" → return "LinkedIn Learning"
- "Udemy Certificate of Completion" → return "Udemy"

Extract the company name:"#;
