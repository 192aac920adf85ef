pub fn sdk_script() -> String {
    r##"// Pounce chat widget loader
(function(global) {
  const cfg = global.POUNCE_CONFIG || {};
  const src = document.currentScript && document.currentScript.src;
  const base = src ? new URL(src).origin : "";

  function injectStylesheet(url) {
    fetch(base + url)
      .then((r) => (r.ok ? r.text() : ""))
      .then((css) => {
        if (!css) return;
        const st = document.createElement("style");
        st.textContent = css;
        document.head.appendChild(st);
      })
      .catch((err) => console.warn("Pounce: stylesheet unavailable", err));
  }

  function wire(wrap) {
    const bubble = wrap.querySelector(".pounce-bubble");
    const pop = wrap.querySelector(".pounce-popup");
    const log = wrap.querySelector("#pounce-log");
    const form = wrap.querySelector("#pounce-form");
    const msg = wrap.querySelector("#pounce-msg");
    const append = (cls, mark, text) => {
      const div = document.createElement("div");
      div.className = cls;
      div.textContent = mark + " " + text;
      log.appendChild(div);
      log.scrollTop = log.scrollHeight;
    };

    bubble.onclick = () => { pop.style.display = "flex"; bubble.style.display = "none"; };
    wrap.querySelector(".pounce-close").onclick = () => {
      pop.style.display = "none"; bubble.style.display = "flex";
    };
    form.onsubmit = async (e) => {
      e.preventDefault();
      const t = msg.value.trim();
      if (!t) return;
      append("pounce-user", "🧑‍🎓", t);
      msg.value = "";
      let reply = "[error]";
      try {
        const r = await fetch(base + "/chat", {
          method: "POST",
          headers: { "Content-Type": "application/json" },
          body: JSON.stringify({ message: t }),
        });
        const js = await r.json();
        reply = (js && js.choices && js.choices[0] && js.choices[0].message &&
                 js.choices[0].message.content) || "[error]";
      } catch (err) {
        console.warn("Pounce: chat exchange failed", err);
      }
      append("pounce-bot", "🐾", reply);
    };
  }

  async function mount() {
    const existing = document.querySelector(".pounce-wrap");
    if (existing) { wire(existing); return; }
    let res;
    try {
      res = await fetch(base + "/widget/mount", {
        method: "POST",
        headers: { "Content-Type": "application/json" },
        body: JSON.stringify({ config: cfg, path: global.location.pathname }),
      });
    } catch (err) {
      console.warn("Pounce: mount request failed", err);
      return;
    }
    if (res.status === 204 || !res.ok) return;
    const plan = await res.json();
    injectStylesheet(plan.stylesheet_url);
    const root = document.documentElement;
    for (const v of plan.variables) root.style.setProperty(v.name, v.value);
    const holder = document.createElement("div");
    holder.innerHTML = plan.markup;
    const wrap = holder.firstElementChild;
    document.body.appendChild(wrap);
    wire(wrap);
  }

  global.PounceWidget = { mount };
  if (document.readyState === "loading") {
    document.addEventListener("DOMContentLoaded", mount);
  } else {
    mount();
  }
})(window);
"##
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_targets_widget_routes() {
        let script = sdk_script();
        assert!(script.contains("/widget/mount"));
        assert!(script.contains("\"/chat\""));
        assert!(script.contains("POUNCE_CONFIG"));
        assert!(script.contains("\"[error]\""));
    }
}
