//! Anti-fingerprinting script injected into every new document.

use crate::fingerprint::Fingerprint;

/// WebGL `UNMASKED_VENDOR_WEBGL`.
const GL_UNMASKED_VENDOR: u32 = 37445;
/// WebGL `UNMASKED_RENDERER_WEBGL`.
const GL_UNMASKED_RENDERER: u32 = 37446;

const TEMPLATE: &str = r"(() => {
  const fp = __FINGERPRINT__;
  const define = (proto, key, value) => {
    try {
      Object.defineProperty(proto, key, { get: () => value, configurable: true });
    } catch (_) {}
  };

  define(Navigator.prototype, 'webdriver', undefined);
  for (const key of Object.keys(window)) {
    if (key.startsWith('cdc_') || key.startsWith('$cdc_')) {
      try { delete window[key]; } catch (_) {}
    }
  }
  if (!window.chrome && !fp.firefox) {
    window.chrome = { runtime: {}, app: { isInstalled: false } };
  }

  const plugins = fp.plugins.map((name) => ({
    name,
    filename: name.toLowerCase().replace(/\s+/g, '-') + '.plugin',
    description: name,
    length: 1,
  }));
  plugins.item = (i) => plugins[i] || null;
  plugins.namedItem = (n) => plugins.find((p) => p.name === n) || null;
  plugins.refresh = () => {};
  define(Navigator.prototype, 'plugins', plugins);

  define(Navigator.prototype, 'languages', Object.freeze(fp.languages.slice()));
  define(Navigator.prototype, 'language', fp.languages[0]);
  define(Navigator.prototype, 'platform', fp.platform);
  define(Navigator.prototype, 'hardwareConcurrency', fp.hardwareConcurrency);

  const resolvedOptions = Intl.DateTimeFormat.prototype.resolvedOptions;
  Intl.DateTimeFormat.prototype.resolvedOptions = function () {
    const options = resolvedOptions.apply(this, arguments);
    options.timeZone = fp.timezone;
    options.locale = fp.locale;
    return options;
  };

  const patchGl = (ctx) => {
    if (!ctx) return;
    const getParameter = ctx.prototype.getParameter;
    ctx.prototype.getParameter = function (param) {
      if (param === __GL_VENDOR__) return fp.webglVendor;
      if (param === __GL_RENDERER__) return fp.webglRenderer;
      return getParameter.apply(this, arguments);
    };
  };
  patchGl(window.WebGLRenderingContext);
  patchGl(window.WebGL2RenderingContext);

  const permissions = window.navigator.permissions;
  if (permissions && permissions.query) {
    const query = permissions.query.bind(permissions);
    permissions.query = (params) =>
      params && params.name === 'notifications'
        ? Promise.resolve({ state: Notification.permission })
        : query(params);
  }
})();";

/// Render the stealth script for `fingerprint`.
///
/// Fingerprint values are embedded as a JSON literal so arbitrary strings
/// cannot break out of the script.
#[must_use]
pub fn stealth_script(fingerprint: &Fingerprint) -> String {
    let payload = serde_json::json!({
        "plugins": fingerprint.plugins,
        "languages": fingerprint.languages(),
        "locale": fingerprint.locale,
        "timezone": fingerprint.timezone,
        "platform": fingerprint.platform,
        "hardwareConcurrency": fingerprint.hardware_concurrency,
        "webglVendor": fingerprint.webgl_vendor,
        "webglRenderer": fingerprint.webgl_renderer,
        "firefox": fingerprint.is_firefox(),
    });
    TEMPLATE
        .replace("__FINGERPRINT__", &payload.to_string())
        .replace("__GL_VENDOR__", &GL_UNMASKED_VENDOR.to_string())
        .replace("__GL_RENDERER__", &GL_UNMASKED_RENDERER.to_string())
}
