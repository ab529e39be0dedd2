use crate::templates::TEMPLATE_ROUTE_PREFIX;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; background: #f9fafb; margin: 0; padding: 48px 24px; color: #111827; }
main { max-width: 1100px; margin: 0 auto; }
h1 { text-align: center; font-size: 2.5rem; margin-bottom: 0.25rem; color: #4f46e5; }
.lead { text-align: center; color: #6b7280; margin-bottom: 2.5rem; }
.grid { display: grid; grid-template-columns: 1fr 1fr; gap: 32px; }
.card { background: #fff; border: 1px solid #e5e7eb; border-radius: 16px; padding: 24px; margin-bottom: 24px; }
.gallery { display: grid; grid-template-columns: repeat(4, 1fr); gap: 12px; max-height: 400px; overflow-y: auto; }
.gallery figure { margin: 0; cursor: pointer; border: 2px solid transparent; border-radius: 8px; overflow: hidden; aspect-ratio: 2 / 3; }
.gallery figure.selected { border-color: #4f46e5; box-shadow: 0 0 0 2px #c7d2fe; }
.gallery img { width: 100%; height: 100%; object-fit: cover; }
.dropzone { border: 2px dashed #d1d5db; transition: border-color 0.2s, background 0.2s; }
.dropzone.dragging { border-color: #4f46e5; background: #eef2ff; }
.dropzone p { color: #6b7280; margin: 0 0 12px; }
#preview { max-width: 100%; max-height: 240px; display: none; margin-top: 12px; }
textarea { width: 100%; min-height: 100px; border: 1px solid #e5e7eb; border-radius: 8px; padding: 12px; box-sizing: border-box; }
button { width: 100%; padding: 16px; border: 0; border-radius: 12px; font-size: 1.1rem; background: #4f46e5; color: #fff; cursor: pointer; }
button:disabled { background: #f3f4f6; color: #9ca3af; cursor: not-allowed; }
#error { color: #ef4444; background: #fef2f2; padding: 16px; border-radius: 8px; margin-top: 16px; display: none; }
#result { min-height: 560px; display: flex; align-items: center; justify-content: center; border: 1px dashed #e5e7eb; border-radius: 12px; background: #f9fafb; flex-direction: column; }
#result img { max-width: 100%; max-height: 560px; }
.note { color: #92400e; background: #fffbeb; padding: 12px; border-radius: 8px; }
.empty { color: #9ca3af; }
"#;

const SCRIPT: &str = r#"
let selectedTemplate = null;
let selectedImage = null;
let isGenerating = false;

const button = document.getElementById('generate');
const errorBox = document.getElementById('error');
const result = document.getElementById('result');

function refreshButton() {
  button.disabled = !selectedImage || !selectedTemplate || isGenerating;
  button.textContent = isGenerating ? 'Generating Magic...' : 'Generate Photo';
}

function toDataUri(blob) {
  return new Promise((resolve, reject) => {
    const reader = new FileReader();
    reader.onloadend = () => resolve(reader.result);
    reader.onerror = () => reject(reader.error);
    reader.readAsDataURL(blob);
  });
}

function showError(message) {
  errorBox.textContent = message;
  errorBox.style.display = message ? 'block' : 'none';
}

function renderOutput(output, note) {
  result.replaceChildren();
  if (output.startsWith('http') || output.startsWith('data:')) {
    const img = document.createElement('img');
    img.src = output;
    img.alt = 'Generated AI';
    result.appendChild(img);
  } else {
    const text = document.createElement('p');
    text.textContent = output;
    result.appendChild(text);
  }
  if (note) {
    const hint = document.createElement('p');
    hint.className = 'note';
    hint.textContent = note;
    result.appendChild(hint);
  }
}

document.querySelectorAll('.gallery figure').forEach((figure) => {
  figure.addEventListener('click', () => {
    document.querySelectorAll('.gallery figure').forEach((f) => f.classList.remove('selected'));
    figure.classList.add('selected');
    selectedTemplate = figure.dataset.template;
    refreshButton();
  });
});

async function handleFile(file) {
  if (!file || !file.type.startsWith('image/')) {
    showError('Please choose an image file.');
    return;
  }
  showError('');
  selectedImage = await toDataUri(file);
  const preview = document.getElementById('preview');
  preview.src = selectedImage;
  preview.style.display = 'block';
  refreshButton();
}

document.getElementById('selfie').addEventListener('change', (event) => {
  handleFile(event.target.files && event.target.files[0]);
});

const dropzone = document.getElementById('dropzone');
dropzone.addEventListener('dragover', (event) => {
  event.preventDefault();
  dropzone.classList.add('dragging');
});
dropzone.addEventListener('dragleave', () => dropzone.classList.remove('dragging'));
dropzone.addEventListener('drop', (event) => {
  event.preventDefault();
  dropzone.classList.remove('dragging');
  handleFile(event.dataTransfer.files && event.dataTransfer.files[0]);
});

button.addEventListener('click', async () => {
  if (!selectedImage || !selectedTemplate || isGenerating) return;
  isGenerating = true;
  showError('');
  refreshButton();
  try {
    const templateRes = await fetch('/templates/' + encodeURIComponent(selectedTemplate));
    if (!templateRes.ok) throw new Error('Could not load the selected template.');
    const template = await toDataUri(await templateRes.blob());

    const response = await fetch('/api/predictions', {
      method: 'POST',
      headers: { 'Content-Type': 'application/json' },
      body: JSON.stringify({
        image: selectedImage,
        template: template,
        prompt: document.getElementById('prompt').value,
      }),
    });
    const data = await response.json();
    if (!response.ok) throw new Error(data.error || 'Failed to generate');
    renderOutput(Array.isArray(data.output) ? data.output[0] : data.output, data.note);
  } catch (err) {
    showError(err instanceof Error ? err.message : 'An error occurred');
  } finally {
    isGenerating = false;
    refreshButton();
  }
});

refreshButton();
"#;

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn render_gallery(templates: &[String]) -> String {
    if templates.is_empty() {
        return "<p class=\"empty\">No templates available.</p>".to_string();
    }

    let mut gallery = String::from("<div class=\"gallery\">");
    for template in templates {
        let name = escape_html(template);
        gallery.push_str(&format!(
            "<figure data-template=\"{name}\"><img src=\"{prefix}{name}\" alt=\"{name}\" loading=\"lazy\"></figure>",
            name = name,
            prefix = TEMPLATE_ROUTE_PREFIX,
        ));
    }
    gallery.push_str("</div>");
    gallery
}

/// The studio page: gallery, upload, prompt, submit and result pane.
pub fn render_index(templates: &[String]) -> String {
    let mut html = String::from(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>AI Photo Studio</title><style>",
    );
    html.push_str(STYLE);
    html.push_str(
        "</style></head><body><main>\
         <h1>AI Photo Studio</h1>\
         <p class=\"lead\">Upload your selfie, pick a style, and let AI transform you.</p>\
         <div class=\"grid\"><div>\
         <section class=\"card\"><h2>1. Select Style</h2>",
    );
    html.push_str(&render_gallery(templates));
    html.push_str(
        "</section>\
         <section class=\"card dropzone\" id=\"dropzone\"><h2>2. Upload Selfie</h2>\
         <p>Drag and drop a photo here, or choose a file.</p>\
         <input type=\"file\" id=\"selfie\" accept=\"image/*\"><img id=\"preview\" alt=\"Preview\"></section>\
         <section class=\"card\"><h2>3. Custom Prompts (Optional)</h2>\
         <textarea id=\"prompt\" placeholder=\"E.g. Make it look cinematic, add cybernetic enhancements...\"></textarea></section>\
         <button id=\"generate\" disabled>Generate Photo</button>\
         <div id=\"error\"></div>\
         </div><div><section class=\"card\"><h2>Result</h2>\
         <div id=\"result\"><p class=\"empty\">Your masterpiece will appear here</p></div>\
         </section></div></div></main><script>",
    );
    html.push_str(SCRIPT);
    html.push_str("</script></body></html>");
    html
}
