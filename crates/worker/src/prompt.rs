use std::fmt::Write;

use nftdonate_types::TaskRequest;

pub const SYSTEM_PROMPT: &str = "You are an expert AI assistant specializing in personalized NFT donation recommendations. \
Always respond with valid JSON only.";

/// Phrase that marks a requester without any past donations.
pub const NEW_USER_LINE: &str = "This is a new user with no donation history.";

const DEFAULT_CATEGORY: &str = "General";
const DEFAULT_DESCRIPTION: &str = "No description";

const RESPONSE_CONTRACT: &str = r#"For each recommendation:
1. Explain WHY this NFT is a good match
2. Provide a confidence score (0-100)
3. Consider donation patterns, categories, impact potential, and social good

Response format (valid JSON only):
{
  "recommendations": [
    {
      "nftId": "string",
      "reason": "string (2-3 sentences max)",
      "confidence": number
    }
  ]
}"#;

/// Render the user prompt for `request`.
///
/// The output depends only on the request.
pub fn build_prompt(request: &TaskRequest) -> String {
    let mut prompt = String::with_capacity(512 + request.catalog.len() * 128);

    prompt.push_str("You are an AI assistant helping users discover meaningful NFT donation opportunities.\n\n");
    let _ = writeln!(prompt, "User Wallet: {}\n", request.requester_address);

    if request.is_new_user() {
        prompt.push_str(NEW_USER_LINE);
        prompt.push_str("\n\n");
    } else {
        prompt.push_str("This user has previously donated to the following NFTs:\n");
        for donation in &request.donation_history {
            let _ = writeln!(
                prompt,
                "- \"{}\" (ID: {}): {} ETH - Category: {}",
                donation.item_name,
                donation.item_id,
                donation.amount,
                donation.category.as_deref().unwrap_or(DEFAULT_CATEGORY)
            );
        }
        prompt.push('\n');
    }

    prompt.push_str("Available NFTs for donation:\n");
    for item in &request.catalog {
        let _ = writeln!(
            prompt,
            "- ID: {}, Name: \"{}\", Category: {}, Description: {}, Total Received: {} ETH",
            item.item_id,
            item.name,
            item.category.as_deref().unwrap_or(DEFAULT_CATEGORY),
            item.description.as_deref().unwrap_or(DEFAULT_DESCRIPTION),
            item.total_received
        );
    }

    let basis = if request.is_new_user() {
        "the available opportunities"
    } else {
        "the user's donation history and interests"
    };
    let _ = write!(
        prompt,
        "\nBased on {basis}, recommend the top 3 NFTs they should consider donating to.\n\n{RESPONSE_CONTRACT}"
    );

    prompt
}
