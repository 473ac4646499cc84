//! The Gecko-side script that rewrites the addon collection cache.
//!
//! The script runs inside the target app's main process with chrome
//! privileges, delivered through the console actor's `evaluateJSAsync`.

use fenix_inject_catalog::FIXUP_SUMMARY_SENTINEL;

/// The script resolves to this string when it finds nothing to overwrite.
pub(crate) const NO_CACHE_SENTINEL: &str = "No existing cache file";

/// Body of the remote write. Wrapped into an async IIFE by
/// [`build_eval_script`]; the engine resolves the returned promise because
/// the evaluation request sets `mapped.await`.
const REMOTE_SCRIPT: &str = r#"async function(addonData, appId, fixup) {
	const parsed = JSON.parse(addonData);
	if(fixup) {
		const { AddonManager } = ChromeUtils.import("resource://gre/modules/AddonManager.jsm");
		for(const entry of parsed.results) {
			if(entry.addon.summary !== "fenix-inject: pending local fixup") {
				continue;
			}
			const local = await AddonManager.getAddonByID(entry.addon.guid);
			if(!local) {
				continue;
			}
			entry.addon.name = local.name;
			entry.addon.summary = local.description;
			const file = entry.addon.current_version && entry.addon.current_version.files[0];
			if(file && local.userPermissions) {
				file.permissions = [
					...local.userPermissions.permissions,
					...local.userPermissions.origins,
				];
			}
			const icons = local.icons || {};
			const sizes = Object.keys(icons).map(Number).filter(n => !isNaN(n)).sort((a, b) => b - a);
			const best = sizes.length ? icons[sizes[0]] : null;
			if(best && !best.split("?")[0].endsWith(".svg")) {
				const response = await fetch(best);
				const blob = await response.blob();
				entry.addon.icon_url = await new Promise(resolve => {
					const reader = new FileReader();
					reader.onloadend = () => resolve(reader.result);
					reader.readAsDataURL(blob);
				});
			}
		}
		addonData = JSON.stringify(parsed);
	}
	const dummyScope = {};
	const { FileUtils } = Cu.import("resource://gre/modules/FileUtils.jsm", dummyScope);
	const filesDir = new FileUtils.File(`/data/data/${appId}/files`);
	const re = /^mozilla_components_addon_collection(_[\w-]+)?\.json$/;
	let file = null;
	for(const candidate of filesDir.directoryEntries) {
		if(re.test(candidate.leafName)) {
			file = candidate;
			break;
		}
	}
	if(!file) {
		return "No existing cache file";
	}
	const before = { fileSize: file.fileSize, permissions: file.permissions };
	const ostream = FileUtils.openAtomicFileOutputStream(file);
	try {
		const bytes = new TextEncoder().encode(addonData);
		// "latin1" here is really Windows-1252, so widen the bytes by hand,
		// in chunks that stay under the argument-list limit.
		let encoded = '';
		const chunkSize = 102400;
		for(let i = 0; i < bytes.length; i += chunkSize) {
			encoded += String.fromCharCode.apply(null, bytes.slice(i, i + chunkSize));
		}
		ostream.write(encoded, encoded.length);
		ostream.flush();
	} finally {
		FileUtils.closeAtomicFileOutputStream(ostream);
	}
	file = new FileUtils.File(file.path);
	// Not quite 100 years, because leap years, but long enough.
	file.lastModifiedTime += 100 * 365 * 24 * 60 * 60 * 1000;
	return before.permissions.toString(8) + " -> " + file.permissions.toString(8) + "\n"
		+ before.fileSize + " -> " + file.fileSize + "\n"
		+ "Wrote to " + file.path;
}"#;

/// Bind the manifest text, target package, and fixup flag into one
/// self-contained script expression.
pub(crate) fn build_eval_script(
    manifest_json: &str,
    app: &str,
    fixup: bool,
) -> Result<String, serde_json::Error> {
    Ok(format!(
        "({})({}, {}, {})",
        REMOTE_SCRIPT,
        serde_json::to_string(manifest_json)?,
        serde_json::to_string(app)?,
        fixup,
    ))
}
