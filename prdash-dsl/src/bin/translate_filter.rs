/// Filter Translation Tracer - Shows a filter flowing through the DSL pipeline
///
/// Usage: cargo run --bin translate_filter -- [--provider kind:host] '<filter>'
///        cargo run --bin translate_filter -- --keywords
use chrono::Utc;
use prdash_core::ProviderInstance;
use prdash_dsl::{
    normalize, parse_filter, translate_github, translate_gitlab, validate_filter, RESERVED_WORDS,
};

fn usage() -> ! {
    eprintln!("Usage: cargo run --bin translate_filter -- [--provider kind:host] '<filter>'");
    eprintln!("       cargo run --bin translate_filter -- --keywords");
    eprintln!();
    eprintln!("Example:");
    eprintln!(r#"  cargo run --bin translate_filter -- 'state = "open" and author = "me"'"#);
    std::process::exit(1);
}

fn main() {
    let mut provider: Option<ProviderInstance> = None;
    let mut filter: Option<String> = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--keywords" => {
                for word in RESERVED_WORDS {
                    println!("{}", word);
                }
                return;
            }
            "--provider" => {
                let Some(id) = args.next() else { usage() };
                match ProviderInstance::from_id(&id) {
                    Ok(instance) => provider = Some(instance),
                    Err(e) => {
                        eprintln!("❌ {}", e);
                        std::process::exit(1);
                    }
                }
            }
            _ if filter.is_none() => filter = Some(arg),
            _ => usage(),
        }
    }

    let Some(filter) = filter else { usage() };

    println!("╔═══════════════════════════════════════════════════════════════");
    println!("║ FILTER TRANSLATION TRACER");
    println!("╚═══════════════════════════════════════════════════════════════\n");

    println!("📝 INPUT FILTER:");
    println!("{}\n", filter);

    if let Err(e) = validate_filter(&filter) {
        println!("⚠️  LEGACY SYNTAX: {}\n", e);
    }

    let expr = match parse_filter(&filter) {
        Ok(expr) => expr,
        Err(e) => {
            eprintln!("❌ Parse failed: {}", e);
            if e.offset() <= filter.len() {
                eprintln!("   {}", filter);
                eprintln!("   {}^", " ".repeat(e.offset()));
            }
            std::process::exit(1);
        }
    };

    println!("🔍 CANONICAL:");
    println!("{}\n", expr);
    println!("🔧 NORMALIZED:");
    println!("{}\n", normalize(&expr));

    let now = Utc::now();
    let report = serde_json::json!({
        "github": translate_github(&expr, now).map_err(|e| e.to_string()),
        "gitlab": translate_gitlab(&expr, now).map_err(|e| e.to_string()),
    });
    println!("📦 TRANSLATIONS:");
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("❌ Failed to render translations: {}", e),
    }

    if let Some(instance) = provider {
        let routed = translate_github(&expr, now)
            .map(|q| q.provider_filter)
            .or_else(|_| translate_gitlab(&expr, now).map(|q| q.provider_filter));
        match routed {
            Ok(filter) => println!(
                "\n🧭 {} is {}",
                instance.id,
                if filter.allows(&instance) { "selected" } else { "skipped" }
            ),
            Err(e) => eprintln!("\n❌ Provider routing failed: {}", e),
        }
    }
}
