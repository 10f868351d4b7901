//! Capability registry
//!
//! Two flag sets gate the conversation: the capabilities this client
//! declares in its initialize request, and the capabilities the adapter
//! returns in the initialize response. [`CapabilityRegistry::allows`] is
//! consulted by the queue before any request is written to the wire.
//!
//! The adapter block also owns the array-valued entries (exception
//! breakpoint filters, module columns, checksum algorithms, breakpoint
//! modes) so they outlive the raw response they were parsed from.

use crate::command::Command;
use crate::protocol::InitializeRequestArguments;
use serde::{Deserialize, Serialize};

// ============================================================
// CLIENT CAPABILITIES
// ============================================================

/// Capabilities this client declared in its initialize request, reflected
/// from the boolean fields of [`InitializeRequestArguments`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientCapabilities {
    pub lines_start_at1: bool,
    pub columns_start_at1: bool,
    pub supports_variable_type: bool,
    pub supports_variable_paging: bool,
    pub supports_run_in_terminal_request: bool,
    pub supports_memory_references: bool,
    pub supports_progress_reporting: bool,
    pub supports_invalidated_event: bool,
    pub supports_memory_event: bool,
    pub supports_args_can_be_interpreted_by_shell: bool,
    pub supports_start_debugging_request: bool,
    pub supports_ansi_styling: bool,
}

impl From<&InitializeRequestArguments> for ClientCapabilities {
    fn from(args: &InitializeRequestArguments) -> Self {
        Self {
            lines_start_at1: args.lines_start_at1.unwrap_or(true),
            columns_start_at1: args.columns_start_at1.unwrap_or(true),
            supports_variable_type: args.supports_variable_type.unwrap_or(false),
            supports_variable_paging: args.supports_variable_paging.unwrap_or(false),
            supports_run_in_terminal_request: args
                .supports_run_in_terminal_request
                .unwrap_or(false),
            supports_memory_references: args.supports_memory_references.unwrap_or(false),
            supports_progress_reporting: args.supports_progress_reporting.unwrap_or(false),
            supports_invalidated_event: args.supports_invalidated_event.unwrap_or(false),
            supports_memory_event: args.supports_memory_event.unwrap_or(false),
            supports_args_can_be_interpreted_by_shell: args
                .supports_args_can_be_interpreted_by_shell
                .unwrap_or(false),
            supports_start_debugging_request: args
                .supports_start_debugging_request
                .unwrap_or(false),
            supports_ansi_styling: args.supports_ansi_styling.unwrap_or(false),
        }
    }
}

// ============================================================
// ADAPTER CAPABILITIES
// ============================================================

/// An exception breakpoint filter advertised by the adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionBreakpointsFilter {
    /// Value to send back in setExceptionBreakpoints
    pub filter: String,
    /// Label shown in the UI
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Filter is enabled by default
    #[serde(default)]
    pub default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_condition: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_description: Option<String>,
}

/// A column the adapter wants shown in a modules view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub attribute_name: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub column_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
}

/// A breakpoint mode advertised by the adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointMode {
    pub mode: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub applies_to: Vec<String>,
}

/// Capabilities the adapter returned in its initialize response.
///
/// Deserialized straight from the response body; every field is optional
/// because adapters only set what they implement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_configuration_done_request: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_function_breakpoints: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_conditional_breakpoints: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_hit_conditional_breakpoints: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_evaluate_for_hovers: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_step_back: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_set_variable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_restart_frame: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_goto_targets_request: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_step_in_targets_request: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_completions_request: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_modules_request: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_restart_request: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_exception_options: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_value_formatting_options: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_exception_info_request: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support_terminate_debuggee: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support_suspend_debuggee: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_delayed_stack_trace_loading: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_loaded_sources_request: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_log_points: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_terminate_threads_request: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_set_expression: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_terminate_request: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_data_breakpoints: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_read_memory_request: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_write_memory_request: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_disassemble_request: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_cancel_request: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_breakpoint_locations_request: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_clipboard_context: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_stepping_granularity: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_instruction_breakpoints: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_exception_filter_options: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_single_thread_execution_requests: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_data_breakpoint_bytes: Option<bool>,
    #[serde(rename = "supportsANSIStyling", skip_serializing_if = "Option::is_none")]
    pub supports_ansi_styling: Option<bool>,
    /// Filters shown in the UI for setExceptionBreakpoints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_breakpoint_filters: Option<Vec<ExceptionBreakpointsFilter>>,
    /// Characters that should trigger completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_trigger_characters: Option<Vec<String>>,
    /// Extra columns for a modules view
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_module_columns: Option<Vec<ColumnDescriptor>>,
    /// Checksum algorithms the adapter understands
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_checksum_algorithms: Option<Vec<String>>,
    /// Breakpoint modes for setBreakpoints / setInstructionBreakpoints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakpoint_modes: Option<Vec<BreakpointMode>>,
}

macro_rules! merge_flags {
    ($dst:expr, $src:expr, $($field:ident),+ $(,)?) => {
        $( if $src.$field.is_some() { $dst.$field = $src.$field.clone(); } )+
    };
}

fn flag(value: Option<bool>) -> bool {
    value.unwrap_or(false)
}

impl AdapterCapabilities {
    /// Merge a capability update (from a `capabilities` event) into this
    /// set: only fields present in `update` are overwritten.
    pub fn merge(&mut self, update: &AdapterCapabilities) {
        merge_flags!(
            self,
            update,
            supports_configuration_done_request,
            supports_function_breakpoints,
            supports_conditional_breakpoints,
            supports_hit_conditional_breakpoints,
            supports_evaluate_for_hovers,
            supports_step_back,
            supports_set_variable,
            supports_restart_frame,
            supports_goto_targets_request,
            supports_step_in_targets_request,
            supports_completions_request,
            supports_modules_request,
            supports_restart_request,
            supports_exception_options,
            supports_value_formatting_options,
            supports_exception_info_request,
            support_terminate_debuggee,
            support_suspend_debuggee,
            supports_delayed_stack_trace_loading,
            supports_loaded_sources_request,
            supports_log_points,
            supports_terminate_threads_request,
            supports_set_expression,
            supports_terminate_request,
            supports_data_breakpoints,
            supports_read_memory_request,
            supports_write_memory_request,
            supports_disassemble_request,
            supports_cancel_request,
            supports_breakpoint_locations_request,
            supports_clipboard_context,
            supports_stepping_granularity,
            supports_instruction_breakpoints,
            supports_exception_filter_options,
            supports_single_thread_execution_requests,
            supports_data_breakpoint_bytes,
            supports_ansi_styling,
            exception_breakpoint_filters,
            completion_trigger_characters,
            additional_module_columns,
            supported_checksum_algorithms,
            breakpoint_modes,
        );
    }
}

/// Body of the `capabilities` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitiesEventBody {
    pub capabilities: AdapterCapabilities,
}

// ============================================================
// REGISTRY
// ============================================================

/// The two capability sets of a connection, plus the gating predicate.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    /// What this client declared in its initialize request
    pub client: ClientCapabilities,
    /// What the adapter returned; empty until the initialize response
    pub adapter: AdapterCapabilities,
}

impl CapabilityRegistry {
    /// Record the client side from the initialize arguments that were sent
    pub fn set_client(&mut self, args: &InitializeRequestArguments) {
        self.client = ClientCapabilities::from(args);
    }

    /// Record the adapter side from the initialize response body
    pub fn set_adapter(&mut self, capabilities: AdapterCapabilities) {
        self.adapter = capabilities;
    }

    /// Whether the adapter's declared capabilities permit sending `command`.
    ///
    /// Core conversational requests are always allowed; optional requests
    /// require their `supports*` flag; reverse requests are never sendable.
    /// `setExceptionBreakpoints` is useful only when the adapter offers a
    /// real choice of filters, hence the `> 1` rule.
    pub fn allows(&self, command: Command) -> bool {
        use Command::*;

        let caps = &self.adapter;
        match command {
            // Core requests every adapter implements
            Initialize | Launch | Attach | Disconnect | Threads | StackTrace | Scopes
            | Variables | Source | Evaluate | Pause | Continue | Next | StepIn | StepOut
            | SetBreakpoints | Locations => true,

            // Reverse requests flow adapter -> client only
            RunInTerminal | StartDebugging => false,

            SetExceptionBreakpoints => caps
                .exception_breakpoint_filters
                .as_ref()
                .is_some_and(|filters| filters.len() > 1),

            ConfigurationDone => flag(caps.supports_configuration_done_request),
            SetFunctionBreakpoints => flag(caps.supports_function_breakpoints),
            SetVariable => flag(caps.supports_set_variable),
            RestartFrame => flag(caps.supports_restart_frame),
            Goto | GotoTargets => flag(caps.supports_goto_targets_request),
            StepInTargets => flag(caps.supports_step_in_targets_request),
            Completions => flag(caps.supports_completions_request),
            Modules => flag(caps.supports_modules_request),
            Restart => flag(caps.supports_restart_request),
            ExceptionInfo => flag(caps.supports_exception_info_request),
            LoadedSources => flag(caps.supports_loaded_sources_request),
            TerminateThreads => flag(caps.supports_terminate_threads_request),
            SetExpression => flag(caps.supports_set_expression),
            Terminate => flag(caps.supports_terminate_request),
            Cancel => flag(caps.supports_cancel_request),
            BreakpointLocations => flag(caps.supports_breakpoint_locations_request),
            SetInstructionBreakpoints => flag(caps.supports_instruction_breakpoints),
            ReadMemory => flag(caps.supports_read_memory_request),
            WriteMemory => flag(caps.supports_write_memory_request),
            Disassemble => flag(caps.supports_disassemble_request),
            StepBack | ReverseContinue => flag(caps.supports_step_back),
            DataBreakpointInfo | SetDataBreakpoints => flag(caps.supports_data_breakpoints),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters(n: usize) -> Option<Vec<ExceptionBreakpointsFilter>> {
        Some(
            (0..n)
                .map(|i| ExceptionBreakpointsFilter {
                    filter: format!("filter{i}"),
                    label: format!("Filter {i}"),
                    description: None,
                    default: false,
                    supports_condition: None,
                    condition_description: None,
                })
                .collect(),
        )
    }

    #[test]
    fn core_requests_allowed_without_adapter_capabilities() {
        let registry = CapabilityRegistry::default();
        for command in [
            Command::Initialize,
            Command::Launch,
            Command::Attach,
            Command::Disconnect,
            Command::Threads,
            Command::StackTrace,
            Command::Scopes,
            Command::Variables,
            Command::Source,
            Command::Evaluate,
            Command::Pause,
            Command::Continue,
            Command::Next,
            Command::StepIn,
            Command::StepOut,
            Command::SetBreakpoints,
            Command::Locations,
        ] {
            assert!(registry.allows(command), "{command} should always be allowed");
        }
    }

    #[test]
    fn gated_requests_denied_without_flags() {
        let registry = CapabilityRegistry::default();
        for command in [
            Command::ConfigurationDone,
            Command::Terminate,
            Command::Cancel,
            Command::Restart,
            Command::Modules,
            Command::ReadMemory,
            Command::StepBack,
            Command::SetDataBreakpoints,
        ] {
            assert!(!registry.allows(command), "{command} should be gated off");
        }
    }

    #[test]
    fn gated_requests_follow_their_flag() {
        let mut registry = CapabilityRegistry::default();
        registry.adapter.supports_terminate_request = Some(true);
        registry.adapter.supports_step_back = Some(true);
        registry.adapter.supports_data_breakpoints = Some(true);

        assert!(registry.allows(Command::Terminate));
        assert!(registry.allows(Command::StepBack));
        assert!(registry.allows(Command::ReverseContinue));
        assert!(registry.allows(Command::DataBreakpointInfo));
        assert!(registry.allows(Command::SetDataBreakpoints));
        assert!(!registry.allows(Command::Cancel));
    }

    #[test]
    fn reverse_requests_always_forbidden() {
        let mut registry = CapabilityRegistry::default();
        registry.adapter.supports_configuration_done_request = Some(true);
        assert!(!registry.allows(Command::RunInTerminal));
        assert!(!registry.allows(Command::StartDebugging));
    }

    #[test]
    fn exception_breakpoints_need_more_than_one_filter() {
        let mut registry = CapabilityRegistry::default();
        assert!(!registry.allows(Command::SetExceptionBreakpoints));

        registry.adapter.exception_breakpoint_filters = filters(1);
        assert!(!registry.allows(Command::SetExceptionBreakpoints));

        registry.adapter.exception_breakpoint_filters = filters(2);
        assert!(registry.allows(Command::SetExceptionBreakpoints));
    }

    #[test]
    fn client_flags_reflect_initialize_arguments() {
        let config = stepline_config::SessionConfig::new("lldb");
        let args = InitializeRequestArguments::from_config(&config);
        let client = ClientCapabilities::from(&args);
        assert!(client.lines_start_at1);
        assert!(client.supports_variable_type);
        assert!(client.supports_memory_references);
        assert!(!client.supports_run_in_terminal_request);
    }

    #[test]
    fn adapter_capabilities_parse_from_response_body() {
        let body = serde_json::json!({
            "supportsConfigurationDoneRequest": true,
            "supportsTerminateRequest": true,
            "exceptionBreakpointFilters": [
                {"filter": "cpp_throw", "label": "C++: on throw", "default": true},
                {"filter": "cpp_catch", "label": "C++: on catch"}
            ],
            "completionTriggerCharacters": [".", "->"],
            "supportedChecksumAlgorithms": ["MD5", "SHA256"]
        });

        let caps: AdapterCapabilities = serde_json::from_value(body).unwrap();
        assert_eq!(caps.supports_configuration_done_request, Some(true));
        assert_eq!(
            caps.exception_breakpoint_filters.as_ref().unwrap().len(),
            2
        );
        assert!(caps.exception_breakpoint_filters.as_ref().unwrap()[0].default);
        assert_eq!(
            caps.completion_trigger_characters,
            Some(vec![".".to_string(), "->".to_string()])
        );
    }

    #[test]
    fn merge_overwrites_only_present_fields() {
        let mut caps = AdapterCapabilities {
            supports_terminate_request: Some(true),
            supports_cancel_request: Some(false),
            ..AdapterCapabilities::default()
        };
        let update = AdapterCapabilities {
            supports_cancel_request: Some(true),
            ..AdapterCapabilities::default()
        };

        caps.merge(&update);
        assert_eq!(caps.supports_terminate_request, Some(true));
        assert_eq!(caps.supports_cancel_request, Some(true));
    }
}
