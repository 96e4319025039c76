//! MCP server implementation

use std::fmt;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::{Json, Parameters};
use rmcp::model::{ServerCapabilities, ServerInfo};
use rmcp::{ErrorData, ServerHandler as RmcpServerHandler, tool, tool_handler, tool_router};

use crate::constants::SYSTEM_CALLER;
use crate::service::DataService;
use crate::types::{FetchDataParams, OperationList, PaginatedResult, ToolResult};

pub struct ServerHandler {
    service: Arc<DataService>,
    tool_router: ToolRouter<Self>,
}

impl Clone for ServerHandler {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            tool_router: Self::tool_router(),
        }
    }
}

impl fmt::Debug for ServerHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerHandler")
            .field("service", &self.service)
            .field("tool_router", &"<ToolRouter>")
            .finish()
    }
}

impl ServerHandler {
    pub fn new(service: Arc<DataService>) -> Self {
        Self {
            service,
            tool_router: Self::tool_router(),
        }
    }

    #[must_use]
    pub fn service(&self) -> &Arc<DataService> {
        &self.service
    }
}

#[tool_router]
impl ServerHandler {
    #[tool(
        description = "Invoke a catalog operation and return one page of normalized records. Results with a closed historical date range are cached for longer than recent ones"
    )]
    async fn fetch_data(
        &self,
        Parameters(params): Parameters<FetchDataParams>,
    ) -> ToolResult<PaginatedResult> {
        let (request, page) = params.into_parts().map_err(ErrorData::from)?;

        self.service
            .handle_mcp_data_request(request, page, SYSTEM_CALLER)
            .await
            .map(Json)
            .map_err(ErrorData::from)
    }

    #[tool(description = "List the operations available to fetch_data")]
    async fn list_operations(&self) -> ToolResult<OperationList> {
        Ok(Json(OperationList {
            operations: self.service.operations(),
        }))
    }
}

#[tool_handler]
impl RmcpServerHandler for ServerHandler {
    fn get_info(&self) -> ServerInfo {
        let mut info = ServerInfo::default();
        info.instructions = Some(
            "Cached, paginated access to a catalog of remote data operations. \
             Call list_operations to discover names, then fetch_data to page through results."
                .to_string(),
        );
        info.capabilities = ServerCapabilities::builder().enable_tools().build();
        info
    }
}
