//! Dialogs drawn by platform helper programs.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{DialogBackend, DialogRequest, InputDialog};
use crate::error::{Error, Result};

/// AppleScript run by `osascript`; the message and title arrive as argv.
const OSASCRIPT_LINES: &[&str] = &[
    "on run argv",
    "set theResult to display dialog (item 1 of argv) with title (item 2 of argv) default answer \"\" buttons {\"Cancel\", \"OK\"} default button \"OK\" cancel button \"Cancel\"",
    "return text returned of theResult",
    "end run",
];

/// WinForms dialog run by PowerShell; the request arrives through the
/// `HITL_DIALOG_*` environment variables.
const POWERSHELL_SCRIPT: &str = r#"
[Console]::OutputEncoding = [System.Text.Encoding]::UTF8
Add-Type -AssemblyName System.Windows.Forms
Add-Type -AssemblyName System.Drawing
try {
    Add-Type -Namespace Hitl -Name Dpi -MemberDefinition '[DllImport("shcore.dll")] public static extern int SetProcessDpiAwareness(int value);'
    [void][Hitl.Dpi]::SetProcessDpiAwareness(2)
} catch {
    try {
        Add-Type -Namespace Hitl -Name DpiLegacy -MemberDefinition '[DllImport("user32.dll")] public static extern bool SetProcessDPIAware();'
        [void][Hitl.DpiLegacy]::SetProcessDPIAware()
    } catch { }
}
[System.Windows.Forms.Application]::EnableVisualStyles()

$width = [int]$env:HITL_DIALOG_WIDTH
$pad = [int]$env:HITL_DIALOG_PADDING
$inner = [Math]::Max(0, [int]$env:HITL_DIALOG_WRAP)
$font = New-Object System.Drawing.Font('Arial', 16, [System.Drawing.FontStyle]::Bold)
$html = [System.Drawing.ColorTranslator]

$form = New-Object System.Windows.Forms.Form
$form.Text = $env:HITL_DIALOG_TITLE
$form.BackColor = [System.Drawing.Color]::White
$form.FormBorderStyle = 'FixedDialog'
$form.MinimizeBox = $false
$form.MaximizeBox = $false
$form.TopMost = $true
$form.StartPosition = 'CenterScreen'

$label = New-Object System.Windows.Forms.Label
$label.Text = $env:HITL_DIALOG_MESSAGE
$label.Font = $font
$label.ForeColor = $html::FromHtml('#333333')
$label.Size = $label.GetPreferredSize((New-Object System.Drawing.Size($inner, 0)))
$label.MaximumSize = New-Object System.Drawing.Size($inner, 0)
$label.Location = New-Object System.Drawing.Point($pad, $pad)
$form.Controls.Add($label)

$entry = New-Object System.Windows.Forms.TextBox
$entry.Font = $font
$entry.BackColor = $html::FromHtml('#F9F9F9')
$entry.BorderStyle = 'FixedSingle'
$entry.Width = $inner
$entry.Location = New-Object System.Drawing.Point($pad, ($label.Bottom + 20))
$form.Controls.Add($entry)

function New-DialogButton($text, $back, $fore, $result) {
    $button = New-Object System.Windows.Forms.Button
    $button.Text = $text
    $button.Font = $font
    $button.FlatStyle = 'Flat'
    $button.FlatAppearance.BorderSize = 0
    $button.BackColor = $html::FromHtml($back)
    $button.ForeColor = $html::FromHtml($fore)
    $button.AutoSize = $true
    $button.Padding = New-Object System.Windows.Forms.Padding(20, 8, 20, 8)
    $button.DialogResult = $result
    return $button
}

$cancel = New-DialogButton 'Cancel' '#DDDDDD' '#333333' ([System.Windows.Forms.DialogResult]::Cancel)
$ok = New-DialogButton 'OK' '#008CBA' '#FFFFFF' ([System.Windows.Forms.DialogResult]::OK)
$top = $entry.Bottom + $pad
$cancel.Location = New-Object System.Drawing.Point(($width - $pad - $cancel.PreferredSize.Width), $top)
$ok.Location = New-Object System.Drawing.Point(($cancel.Left - 25 - $ok.PreferredSize.Width), $top)
$form.Controls.Add($ok)
$form.Controls.Add($cancel)
$form.AcceptButton = $ok
$form.CancelButton = $cancel
$form.ClientSize = New-Object System.Drawing.Size($width, ($top + $cancel.PreferredSize.Height + $pad))
$form.Add_Shown({ $form.Activate(); [void]$entry.Focus() })

if ($form.ShowDialog() -eq [System.Windows.Forms.DialogResult]::OK) {
    [Console]::Out.Write($entry.Text)
    exit 0
}
exit 1
"#;

/// A fully specified helper invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

/// zenity renders `--text` as Pango markup.
fn escape_markup(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Build the helper invocation for a concrete backend.
pub fn build_command(backend: DialogBackend, request: &DialogRequest) -> Result<DialogCommand> {
    let program = backend.program().to_string();
    let (args, env) = match backend {
        DialogBackend::Auto => {
            return Err(Error::Internal(
                "dialog backend must be resolved before building a command".to_string(),
            ))
        }
        DialogBackend::Zenity => (
            vec![
                "--entry".to_string(),
                "--title".to_string(),
                request.title.clone(),
                "--text".to_string(),
                escape_markup(&request.message),
                "--width".to_string(),
                request.width.to_string(),
            ],
            Vec::new(),
        ),
        DialogBackend::Kdialog => (
            vec![
                "--title".to_string(),
                request.title.clone(),
                "--inputbox".to_string(),
                request.message.clone(),
                String::new(),
            ],
            Vec::new(),
        ),
        DialogBackend::Osascript => {
            let mut args: Vec<String> = OSASCRIPT_LINES
                .iter()
                .flat_map(|line| ["-e".to_string(), line.to_string()])
                .collect();
            args.push(request.message.clone());
            args.push(request.title.clone());
            (args, Vec::new())
        }
        DialogBackend::Powershell => (
            vec![
                "-NoProfile".to_string(),
                "-ExecutionPolicy".to_string(),
                "Bypass".to_string(),
                "-Command".to_string(),
                POWERSHELL_SCRIPT.to_string(),
            ],
            vec![
                ("HITL_DIALOG_MESSAGE".to_string(), request.message.clone()),
                ("HITL_DIALOG_TITLE".to_string(), request.title.clone()),
                ("HITL_DIALOG_WIDTH".to_string(), request.width.to_string()),
                ("HITL_DIALOG_PADDING".to_string(), request.padding.to_string()),
                ("HITL_DIALOG_WRAP".to_string(), request.wrap_length().to_string()),
            ],
        ),
    };
    Ok(DialogCommand { program, args, env })
}

fn strip_trailing_newline(mut text: String) -> String {
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
    text
}

/// Map a helper's exit status and output to the dialog result.
///
/// `code` is `None` when the helper was killed by a signal.
pub fn interpret_exit(
    backend: DialogBackend,
    code: Option<i32>,
    stdout: &str,
    stderr: &str,
) -> Result<Option<String>> {
    match (backend, code) {
        (_, Some(0)) => Ok(Some(strip_trailing_newline(stdout.to_string()))),
        // 5 is zenity's timeout status
        (DialogBackend::Zenity, Some(1) | Some(5)) => Ok(None),
        (DialogBackend::Kdialog | DialogBackend::Powershell, Some(1)) => Ok(None),
        // -128 is AppleScript's "User canceled."
        (DialogBackend::Osascript, Some(_)) if stderr.contains("-128") => Ok(None),
        (_, Some(code)) => Err(Error::Dialog(format!(
            "{} exited with status {}: {}",
            backend.program(),
            code,
            stderr.trim()
        ))),
        (_, None) => Err(Error::Dialog(format!(
            "{} was terminated by a signal",
            backend.program()
        ))),
    }
}

/// Dialog drawn by a platform helper. Only one dialog is on screen at a time.
pub struct NativeDialog {
    backend: DialogBackend,
    on_screen: Mutex<()>,
}

impl NativeDialog {
    pub fn new(backend: DialogBackend) -> Self {
        Self {
            backend,
            on_screen: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> DialogBackend {
        self.backend
    }
}

impl Default for NativeDialog {
    fn default() -> Self {
        Self::new(DialogBackend::Auto)
    }
}

#[async_trait]
impl InputDialog for NativeDialog {
    async fn prompt(&self, request: &DialogRequest) -> Result<Option<String>> {
        let _modal = self.on_screen.lock().await;

        let backend = self.backend.resolve()?;
        let command = build_command(backend, request)?;
        debug!("Showing dialog via {}", command.program);

        let output = Command::new(&command.program)
            .args(&command.args)
            .envs(command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => {
                    Error::DialogUnavailable(format!("{} is not installed", command.program))
                }
                _ => Error::Io(e),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let result = interpret_exit(backend, output.status.code(), &stdout, &stderr)?;
        info!(
            "Dialog {}",
            if result.is_some() { "answered" } else { "cancelled" }
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> DialogRequest {
        DialogRequest::new("Pick <one> & go")
            .with_title("Question")
            .with_width(600)
    }

    #[test]
    fn test_zenity_command() {
        let cmd = build_command(DialogBackend::Zenity, &request()).unwrap();
        assert_eq!(cmd.program, "zenity");
        assert_eq!(
            cmd.args,
            vec![
                "--entry",
                "--title",
                "Question",
                "--text",
                "Pick &lt;one&gt; &amp; go",
                "--width",
                "600"
            ]
        );
        assert!(cmd.env.is_empty());
    }

    #[test]
    fn test_kdialog_command() {
        let cmd = build_command(DialogBackend::Kdialog, &request()).unwrap();
        assert_eq!(cmd.program, "kdialog");
        assert_eq!(cmd.args[3], "Pick <one> & go");
        assert_eq!(cmd.args.last().map(String::as_str), Some(""));
    }

    #[test]
    fn test_osascript_passes_text_as_argv() {
        let cmd = build_command(DialogBackend::Osascript, &request()).unwrap();
        assert_eq!(cmd.program, "osascript");
        let n = cmd.args.len();
        assert_eq!(cmd.args[n - 2], "Pick <one> & go");
        assert_eq!(cmd.args[n - 1], "Question");
        assert_eq!(
            cmd.args.iter().filter(|a| a.as_str() == "-e").count(),
            OSASCRIPT_LINES.len()
        );
    }

    #[test]
    fn test_powershell_wrap_never_negative() {
        let narrow = request().with_width(20).with_padding(25);
        let cmd = build_command(DialogBackend::Powershell, &narrow).unwrap();
        assert!(cmd
            .env
            .contains(&("HITL_DIALOG_WRAP".to_string(), "0".to_string())));
        assert!(POWERSHELL_SCRIPT.contains("[Math]::Max(0,"));
    }

    #[test]
    fn test_powershell_passes_text_in_env() {
        let cmd = build_command(DialogBackend::Powershell, &request()).unwrap();
        assert_eq!(cmd.program, "powershell.exe");
        assert!(cmd.args.contains(&"-NoProfile".to_string()));
        assert!(cmd
            .env
            .contains(&("HITL_DIALOG_MESSAGE".to_string(), "Pick <one> & go".to_string())));
        assert!(cmd
            .env
            .contains(&("HITL_DIALOG_WIDTH".to_string(), "600".to_string())));
        assert!(cmd
            .env
            .contains(&("HITL_DIALOG_PADDING".to_string(), "25".to_string())));
        assert!(cmd
            .env
            .contains(&("HITL_DIALOG_WRAP".to_string(), "550".to_string())));
        assert!(POWERSHELL_SCRIPT.contains("MinimizeBox = $false"));
        assert!(POWERSHELL_SCRIPT.contains("MaximizeBox = $false"));
    }

    #[test]
    fn test_auto_backend_cannot_build() {
        assert!(build_command(DialogBackend::Auto, &request()).is_err());
    }

    #[test]
    fn test_interpret_confirm() {
        let result = interpret_exit(DialogBackend::Zenity, Some(0), "hello\n", "").unwrap();
        assert_eq!(result.as_deref(), Some("hello"));

        let result = interpret_exit(DialogBackend::Powershell, Some(0), "hi\r\n", "").unwrap();
        assert_eq!(result.as_deref(), Some("hi"));

        let empty = interpret_exit(DialogBackend::Kdialog, Some(0), "\n", "").unwrap();
        assert_eq!(empty.as_deref(), Some(""));
    }

    #[test]
    fn test_interpret_keeps_inner_newlines() {
        let result = interpret_exit(DialogBackend::Zenity, Some(0), "a\nb\n\n", "").unwrap();
        assert_eq!(result.as_deref(), Some("a\nb\n"));
    }

    #[test]
    fn test_interpret_cancel() {
        assert_eq!(interpret_exit(DialogBackend::Zenity, Some(1), "", "").unwrap(), None);
        assert_eq!(interpret_exit(DialogBackend::Zenity, Some(5), "", "").unwrap(), None);
        assert_eq!(interpret_exit(DialogBackend::Kdialog, Some(1), "", "").unwrap(), None);
        assert_eq!(
            interpret_exit(DialogBackend::Powershell, Some(1), "", "").unwrap(),
            None
        );
        assert_eq!(
            interpret_exit(
                DialogBackend::Osascript,
                Some(1),
                "",
                "execution error: User canceled. (-128)"
            )
            .unwrap(),
            None
        );
    }

    #[test]
    fn test_interpret_failures() {
        let err = interpret_exit(DialogBackend::Zenity, Some(255), "", "cannot open display")
            .unwrap_err();
        assert!(err.to_string().contains("cannot open display"));

        assert!(interpret_exit(DialogBackend::Osascript, Some(1), "", "syntax error").is_err());
        assert!(interpret_exit(DialogBackend::Kdialog, None, "", "").is_err());
    }

    #[test]
    fn test_native_dialog_backend() {
        assert_eq!(NativeDialog::default().backend(), DialogBackend::Auto);
        assert_eq!(
            NativeDialog::new(DialogBackend::Zenity).backend(),
            DialogBackend::Zenity
        );
    }
}
