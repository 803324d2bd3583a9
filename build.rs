#[cfg(windows)]
fn main() {
    let mut res = winres::WindowsResource::new();
    if std::path::Path::new("icons/icon.ico").exists() {
        res.set_icon("icons/icon.ico");
    }
    res.set("ProductName", "Frostpane");
    res.set("FileDescription", "Frostpane - Frosted-glass desktop overlay");
    res.set("LegalCopyright", "© 2025 Frostpane Contributors");
    res.set("CompanyName", "Frostpane");
    res.set("OriginalFilename", "frostpane.exe");

    if let Err(e) = res.compile() {
        eprintln!("Failed to compile Windows resource: {}", e);
    }
}

#[cfg(not(windows))]
fn main() {
}
